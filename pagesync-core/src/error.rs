//! Error types for the publish pipeline.
//!
//! Provider implementations behind the contract traits return boxed
//! [`StoreError`] trait objects; the pipeline wraps them into the typed
//! [`PublishError`] variants so callers can tell a listing failure from an
//! exhausted upload.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error type crossing the `ObjectStore` / `CdnInvalidator` boundary.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Everything that can fail during a publish run.
#[derive(Debug, Error)]
pub enum PublishError {
    /// A matcher or order rule is not a valid regex.
    #[error("invalid pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The local publish root could not be read.
    #[error("failed to read {path:?}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The remote bucket listing failed; nothing was mutated.
    #[error("failed to list remote bucket: {cause}")]
    List { cause: StoreError },

    /// An upload exhausted its retry budget. `completed` counts the files
    /// stored before the failure; the rest of the plan was not executed.
    #[error(
        "failed to upload {key} after {attempts} attempts \
         ({completed} uploads finished before the failure): {cause}"
    )]
    Upload {
        key: String,
        attempts: u32,
        completed: usize,
        cause: StoreError,
    },

    /// A remote-only object could not be removed.
    #[error("failed to delete {key}: {cause}")]
    Delete { key: String, cause: StoreError },

    /// The plan would delete more objects than the configured cap allows;
    /// the run aborts before any mutation.
    #[error("refusing to delete {pending} objects (limit {limit})")]
    DeleteGuard { pending: usize, limit: i64 },
}
