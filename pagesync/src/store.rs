#![doc = "AWS provider clients: bridges the core contracts to S3 and CloudFront."]
//
//! # Provider Integration (CLI <-> Core)
//!
//! This module provides the bridge between the CLI workflow and the provider
//! abstractions in `pagesync-core::contract`. It wires up [`ObjectStore`]
//! against S3 and [`CdnInvalidator`] against CloudFront.
//!
//! ## Client Usage
//!
//! - Build the shared SDK config once with [`aws_sdk_config`] (credentials
//!   come from the ambient AWS chain: env vars, profile, instance role).
//! - Construct [`S3Store`] / [`CloudFrontInvalidator`] from it.
//! - All transport, serialization, and error handling are encapsulated in
//!   the client implementations.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_cloudfront::types::{InvalidationBatch, Paths};
use aws_sdk_s3::primitives::ByteStream;

use pagesync_core::contract::{CdnInvalidator, ObjectStore, PutRequest, RemoteObject};
use pagesync_core::error::StoreError;

/// Load the shared AWS SDK configuration from the ambient credential chain.
pub async fn aws_sdk_config(region: Option<String>) -> aws_config::SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(aws_config::Region::new(region));
    }
    loader.load().await
}

/// Object store backed by an S3 bucket, optionally under a key prefix.
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: Option<String>,
}

impl S3Store {
    pub fn new(config: &aws_config::SdkConfig, bucket: &str, prefix: Option<String>) -> Self {
        tracing::info!(bucket, prefix = ?prefix, "Initialized S3 store");
        Self {
            client: aws_sdk_s3::Client::new(config),
            bucket: bucket.to_string(),
            // Strip trailing slashes to avoid double-slash keys like "prefix//key"
            prefix: prefix.map(|p| p.trim_end_matches('/').to_string()),
        }
    }

    fn full_key(&self, key: &str) -> String {
        apply_prefix(self.prefix.as_deref(), key)
    }
}

/// Full object key for a relative key (applies prefix if configured).
fn apply_prefix(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}/{key}"),
        None => key.to_string(),
    }
}

/// Key relative to the prefix, or the full key if no prefix is configured.
fn strip_key_prefix(prefix: Option<&str>, full_key: &str) -> String {
    match prefix {
        Some(prefix) => {
            let prefix_with_slash = format!("{prefix}/");
            full_key
                .strip_prefix(&prefix_with_slash)
                .unwrap_or(full_key)
                .to_string()
        }
        None => full_key.to_string(),
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list(&self) -> Result<Vec<RemoteObject>, StoreError> {
        tracing::info!(bucket = %self.bucket, "Listing bucket objects");
        let full_prefix = self.prefix.as_deref().map(|p| format!("{p}/"));
        let mut results = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self.client.list_objects_v2().bucket(&self.bucket);
            if let Some(prefix) = &full_prefix {
                request = request.prefix(prefix);
            }
            if let Some(token) = continuation_token.take() {
                request = request.continuation_token(token);
            }

            let output = request.send().await.map_err(|e| {
                tracing::error!(error = ?e, "Failed to list bucket objects");
                StoreError::from(format!("S3 list error: {e}"))
            })?;

            for obj in output.contents() {
                if let Some(obj_key) = obj.key() {
                    results.push(RemoteObject {
                        key: strip_key_prefix(self.prefix.as_deref(), obj_key),
                        etag: obj.e_tag().map(|s| s.to_string()),
                        size: obj.size().unwrap_or(0) as u64,
                    });
                }
            }

            if output.is_truncated() == Some(true) {
                continuation_token = output.next_continuation_token().map(|s| s.to_string());
            } else {
                break;
            }
        }

        tracing::info!(count = results.len(), "Fetched bucket listing");
        Ok(results)
    }

    async fn put<'a>(&self, req: PutRequest<'a>) -> Result<(), StoreError> {
        tracing::info!(
            key = req.key,
            content_type = req.content_type,
            cache_control = ?req.cache_control,
            content_encoding = ?req.content_encoding,
            size = req.body.len(),
            "Uploading object"
        );
        let full_key = self.full_key(req.key);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .body(ByteStream::from(req.body))
            .content_type(req.content_type)
            .set_cache_control(req.cache_control.map(String::from))
            .set_content_encoding(req.content_encoding.map(String::from))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, key = req.key, "Failed to upload object");
                StoreError::from(format!("S3 put error for {}: {e}", req.key))
            })?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        tracing::info!(key, "Deleting object");
        let full_key = self.full_key(key);
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, key, "Failed to delete object");
                StoreError::from(format!("S3 delete error for {key}: {e}"))
            })?;
        Ok(())
    }
}

/// CDN purge backed by a CloudFront distribution.
pub struct CloudFrontInvalidator {
    client: aws_sdk_cloudfront::Client,
    distribution_id: String,
}

impl CloudFrontInvalidator {
    pub fn new(config: &aws_config::SdkConfig, distribution_id: &str) -> Self {
        tracing::info!(distribution_id, "Initialized CloudFront invalidator");
        Self {
            client: aws_sdk_cloudfront::Client::new(config),
            distribution_id: distribution_id.to_string(),
        }
    }
}

#[async_trait]
impl CdnInvalidator for CloudFrontInvalidator {
    async fn invalidate(&self, paths: &[String]) -> Result<(), StoreError> {
        tracing::info!(
            distribution_id = %self.distribution_id,
            paths = paths.len(),
            "Submitting invalidation batch"
        );

        let path_batch = Paths::builder()
            .quantity(paths.len() as i32)
            .set_items(Some(paths.to_vec()))
            .build()?;

        // Unique per run so CloudFront never deduplicates a legitimate batch.
        let caller_reference = format!("pagesync-{}", unix_millis());
        let batch = InvalidationBatch::builder()
            .paths(path_batch)
            .caller_reference(caller_reference)
            .build()?;

        self.client
            .create_invalidation()
            .distribution_id(&self.distribution_id)
            .invalidation_batch(batch)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, "Failed to submit invalidation");
                StoreError::from(format!("CloudFront invalidation error: {e}"))
            })?;
        Ok(())
    }
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}
