//! Transfer planning: the pure diff between local and remote file sets.
//!
//! A plan is computed once per run and immutable afterwards. Planning never
//! mutates anything; the delete-guard in particular trips here, before the
//! execution step touches the bucket.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::{debug, info};

use crate::contract::RemoteObject;
use crate::error::PublishError;
use crate::matcher::{Route, RuleSet};
use crate::scan::{self, LocalFile};

/// One pending upload with its resolved metadata.
#[derive(Debug, Clone)]
pub struct Upload {
    pub key: String,
    pub content_type: &'static str,
    pub route: Route,
}

/// Ordered sequence of operations for one run. Uploads come first, then
/// deletes; within uploads the declared priority groups apply.
#[derive(Debug)]
pub struct TransferPlan {
    pub uploads: Vec<Upload>,
    pub deletes: Vec<String>,
    /// Files present on both sides with identical content, left untouched.
    pub skipped: usize,
}

impl TransferPlan {
    pub fn is_empty(&self) -> bool {
        self.uploads.is_empty() && self.deletes.is_empty()
    }

    /// Absolute CDN paths for everything the plan changes.
    pub fn changed_paths(&self) -> Vec<String> {
        self.uploads
            .iter()
            .map(|u| u.key.as_str())
            .chain(self.deletes.iter().map(String::as_str))
            .map(|key| format!("/{key}"))
            .collect()
    }
}

/// Compute the transfer plan for a local tree against a remote listing.
///
/// A file present locally and remotely with identical content hash produces
/// no operation, so re-planning against an already-synced bucket yields an
/// empty plan. Deletes are only emitted for remote-only keys, and only when
/// their count stays within `max_deletes` (`-1` disables the guard).
pub fn build_plan(
    root: &Path,
    local: &[LocalFile],
    remote: &[RemoteObject],
    rules: &RuleSet,
    max_deletes: i64,
) -> Result<TransferPlan, PublishError> {
    let remote_by_key: HashMap<&str, &RemoteObject> =
        remote.iter().map(|r| (r.key.as_str(), r)).collect();
    let local_keys: HashSet<&str> = local.iter().map(|f| f.key.as_str()).collect();

    let mut uploads = Vec::new();
    let mut skipped = 0usize;

    for file in local {
        let route = rules.route(&file.key);
        let remote_hash = remote_by_key
            .get(file.key.as_str())
            .and_then(|r| comparable_hash(r));

        let changed = match remote_hash {
            Some(hash) => {
                let body = scan::upload_body(root, &file.key, route.gzip)?;
                scan::body_hash(&body) != hash
            }
            // New remotely, or a hash we cannot compare against: upload.
            None => true,
        };

        if changed {
            debug!(key = %file.key, "Planned upload");
            uploads.push(Upload {
                content_type: scan::content_type_for(&file.key),
                key: file.key.clone(),
                route,
            });
        } else {
            skipped += 1;
        }
    }

    uploads.sort_by(|a, b| {
        rules
            .order_index(&a.key)
            .cmp(&rules.order_index(&b.key))
            .then_with(|| a.key.cmp(&b.key))
    });

    let mut deletes: Vec<String> = remote
        .iter()
        .filter(|r| !local_keys.contains(r.key.as_str()))
        .map(|r| r.key.clone())
        .collect();
    deletes.sort();

    if max_deletes >= 0 && deletes.len() as i64 > max_deletes {
        return Err(PublishError::DeleteGuard {
            pending: deletes.len(),
            limit: max_deletes,
        });
    }

    info!(
        uploads = uploads.len(),
        deletes = deletes.len(),
        skipped,
        "Transfer plan computed"
    );

    Ok(TransferPlan {
        uploads,
        deletes,
        skipped,
    })
}

/// Remote hash in a form comparable with our hex-MD5 body hash.
///
/// S3 wraps ETags in quotes; multipart uploads append `-<parts>` and are not
/// an MD5 of the body at all, so they never compare equal and force a
/// re-upload.
fn comparable_hash(remote: &RemoteObject) -> Option<String> {
    let etag = remote.etag.as_deref()?.trim_matches('"');
    if etag.contains('-') {
        return None;
    }
    Some(etag.to_string())
}
