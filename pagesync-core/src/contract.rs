//! # contract: interfaces between the publish pipeline and cloud providers
//!
//! This module defines the two trait seams the pipeline talks through: an
//! [`ObjectStore`] for the bucket holding the published site, and a
//! [`CdnInvalidator`] for purging cached copies of changed paths.
//!
//! ## Interface & Extensibility
//! - Implement [`ObjectStore`] to target a new storage provider (S3, a
//!   filesystem fake, a test mock).
//! - All methods are async, returning results and using boxed error types.
//! - Error handling is uniform: all provider errors return boxed trait objects.
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall` so consumers can generate
//!   deterministic mocks for unit/integration tests (behind the
//!   `test-export-mocks` feature).

use async_trait::async_trait;

use mockall::automock;

use crate::error::StoreError;

/// An object as reported by the remote bucket listing.
#[derive(Debug, Clone)]
pub struct RemoteObject {
    /// Key relative to the configured prefix, slash-separated.
    pub key: String,
    /// Provider content hash. For S3 this is the ETag, which is the hex MD5
    /// of the stored body for simple (non-multipart) puts.
    pub etag: Option<String>,
    pub size: u64,
}

/// Everything needed to store one object, with its resolved metadata.
pub struct PutRequest<'a> {
    /// Destination key, relative to the configured prefix.
    pub key: &'a str,
    /// Exact bytes to store (already compressed when the route says gzip).
    pub body: Vec<u8>,
    pub content_type: &'a str,
    pub cache_control: Option<&'a str>,
    /// `Some("gzip")` when the body is compressed.
    pub content_encoding: Option<&'a str>,
}

/// Trait for the object-storage bucket holding the published site.
///
/// Implementors are responsible for connecting to a backing service. Keys are
/// always relative; any provider-side prefix is applied and stripped by the
/// implementation.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List every object currently in the bucket (under the prefix).
    async fn list(&self) -> Result<Vec<RemoteObject>, StoreError>;

    /// Store one object with its metadata. Each put is independently atomic.
    async fn put<'a>(&self, req: PutRequest<'a>) -> Result<(), StoreError>;

    /// Remove one object by key.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Trait for purging a CDN distribution's cached copies of changed paths.
///
/// Invalidation is fire-and-forget from the pipeline's perspective: the call
/// submits the batch and does not wait for propagation.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait CdnInvalidator: Send + Sync {
    /// Submit one invalidation batch covering the given absolute paths.
    async fn invalidate(&self, paths: &[String]) -> Result<(), StoreError>;
}
