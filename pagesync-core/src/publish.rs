//! High-level pipeline: orchestrates list → scan → plan → execute for one
//! publish run.
//!
//! This module provides the top-level orchestration for publishing a rendered
//! site directory into an object-storage bucket. It:
//!   - Lists the remote bucket and scans the local publish root
//!   - Computes an immutable [`TransferPlan`] (uploads, deletes, skips)
//!   - Executes uploads in plan order with bounded retries, then deletes
//!   - Optionally submits one CDN invalidation covering the changed paths
//!   - Returns a [`PublishReport`] of what was stored and removed.
//!
//! # Responsibilities
//! - Fail-fast orchestration: listing or scan failures abort before any
//!   mutation; an exhausted upload retry aborts the remaining plan.
//! - No rollback on partial failure: objects stored before the failure
//!   remain. This is intentional; each put is independently atomic and a
//!   re-run converges because planning is idempotent.
//! - Invokes logging throughout for traceability (see tracing events).
//!
//! # Callable From
//! - Used by the CLI crate and integration tests.
//! - Expects concrete async [`ObjectStore`] / [`CdnInvalidator`]
//!   implementations, or their mocks.

use std::path::Path;

use futures::future::try_join_all;
use tracing::{debug, error, info, warn};

use crate::config::PublishConfig;
use crate::contract::{CdnInvalidator, ObjectStore, PutRequest};
use crate::error::PublishError;
use crate::matcher::RuleSet;
use crate::plan::{self, TransferPlan};
use crate::retry::RetryPolicy;
use crate::scan;

/// Outcome of one publish run, for logging and downstream audit.
#[derive(Debug)]
pub struct PublishReport {
    /// Keys stored this run, in upload order.
    pub uploaded: Vec<String>,
    /// Keys removed this run.
    pub deleted: Vec<String>,
    /// Files already in sync and left untouched.
    pub skipped: usize,
    /// Whether a CDN invalidation batch was submitted successfully.
    pub invalidated: bool,
    /// True when the run only planned and nothing was mutated.
    pub dry_run: bool,
}

/// Publish the tree under `root` into the store according to `config`.
///
/// With `dry_run` the pipeline stops after planning and reports what would
/// change. Re-running against an already-synced bucket is a no-op.
pub async fn publish<S>(
    root: &Path,
    config: &PublishConfig,
    store: &S,
    cdn: Option<&dyn CdnInvalidator>,
    dry_run: bool,
) -> Result<PublishReport, PublishError>
where
    S: ObjectStore + Sync,
{
    info!(root = %root.display(), dry_run, "Starting publish run");

    let rules = RuleSet::compile(config)?;

    let remote = store
        .list()
        .await
        .map_err(|cause| PublishError::List { cause })?;
    info!(remote_objects = remote.len(), "Listed remote bucket");

    let local = scan::scan_dir(root)?;
    info!(local_files = local.len(), "Scanned local publish root");

    let plan = plan::build_plan(root, &local, &remote, &rules, config.max_deletes)?;

    if dry_run {
        info!(
            uploads = plan.uploads.len(),
            deletes = plan.deletes.len(),
            skipped = plan.skipped,
            "Dry run: stopping after planning"
        );
        return Ok(report_from_plan(plan, true, false));
    }

    if plan.is_empty() {
        info!(skipped = plan.skipped, "Nothing to do: bucket already in sync");
        return Ok(report_from_plan(plan, false, false));
    }

    let policy = RetryPolicy::exponential(config.upload_attempts);
    let uploaded = execute_uploads(root, &plan, store, &policy).await?;

    execute_deletes(&plan, store).await?;
    if !plan.deletes.is_empty() {
        info!(deleted = plan.deletes.len(), "Deletes complete");
    }

    let invalidated = match cdn {
        Some(invalidator) => invalidate(invalidator, &plan).await,
        None => false,
    };

    info!(
        uploaded = uploaded.len(),
        deleted = plan.deletes.len(),
        skipped = plan.skipped,
        invalidated,
        "Publish run complete"
    );

    Ok(PublishReport {
        uploaded,
        deleted: plan.deletes,
        skipped: plan.skipped,
        invalidated,
        dry_run: false,
    })
}

/// Upload the plan in order, sequentially, retrying each file per policy.
///
/// Priority ordering is advisory for visibility, not a hard barrier;
/// sequential execution in plan order satisfies it trivially. On exhausted
/// retries the error names the failing key and how many files were stored
/// before it.
async fn execute_uploads<S>(
    root: &Path,
    plan: &TransferPlan,
    store: &S,
    policy: &RetryPolicy,
) -> Result<Vec<String>, PublishError>
where
    S: ObjectStore + Sync,
{
    let mut uploaded: Vec<String> = Vec::with_capacity(plan.uploads.len());

    for upload in &plan.uploads {
        let body = scan::upload_body(root, &upload.key, upload.route.gzip)?;
        let mut attempt: u32 = 1;

        loop {
            let request = PutRequest {
                key: &upload.key,
                body: body.clone(),
                content_type: upload.content_type,
                cache_control: upload.route.cache_control.as_deref(),
                content_encoding: if upload.route.gzip { Some("gzip") } else { None },
            };

            match store.put(request).await {
                Ok(()) => {
                    debug!(key = %upload.key, attempt, "Uploaded");
                    uploaded.push(upload.key.clone());
                    break;
                }
                Err(cause) => match policy.delay_after(attempt) {
                    Some(delay) => {
                        warn!(
                            key = %upload.key,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %cause,
                            "Upload failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => {
                        error!(
                            key = %upload.key,
                            attempts = attempt,
                            uploaded_before_failure = ?uploaded,
                            error = %cause,
                            "Upload failed, aborting remaining plan"
                        );
                        return Err(PublishError::Upload {
                            key: upload.key.clone(),
                            attempts: attempt,
                            completed: uploaded.len(),
                            cause,
                        });
                    }
                },
            }
        }
    }

    Ok(uploaded)
}

/// Remove remote-only keys, all deletes in flight together (fail fast).
async fn execute_deletes<S>(plan: &TransferPlan, store: &S) -> Result<(), PublishError>
where
    S: ObjectStore + Sync,
{
    let deletions = plan.deletes.iter().map(|key| async move {
        store
            .delete(key)
            .await
            .map_err(|cause| PublishError::Delete {
                key: key.clone(),
                cause,
            })
    });
    try_join_all(deletions).await?;
    Ok(())
}

/// Submit one invalidation batch for everything the plan changed.
///
/// Invalidation failure does not fail the run: the CDN cache self-expires.
async fn invalidate(invalidator: &dyn CdnInvalidator, plan: &TransferPlan) -> bool {
    let paths = plan.changed_paths();
    match invalidator.invalidate(&paths).await {
        Ok(()) => {
            info!(paths = paths.len(), "CDN invalidation submitted");
            true
        }
        Err(error) => {
            warn!(
                paths = paths.len(),
                error = %error,
                "CDN invalidation failed, cached copies will self-expire"
            );
            false
        }
    }
}

fn report_from_plan(plan: TransferPlan, dry_run: bool, invalidated: bool) -> PublishReport {
    PublishReport {
        uploaded: plan.uploads.into_iter().map(|u| u.key).collect(),
        deleted: plan.deletes,
        skipped: plan.skipped,
        invalidated,
        dry_run,
    }
}
