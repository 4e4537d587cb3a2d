use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A pattern-to-cache-policy mapping applied to uploaded files.
///
/// Patterns are regexes matched against the slash-separated relative key.
/// The first matching rule, in declared order, supplies the metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherRule {
    pub pattern: String,
    /// Cache-Control header value for matching files. `None` means no
    /// special caching.
    #[serde(default)]
    pub cache_control: Option<String>,
    /// Gzip-compress the body before upload.
    #[serde(default)]
    pub gzip: bool,
}

/// Publishing behaviour: metadata routing, upload ordering and safety limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Evaluated first-match-wins; unmatched files get a default policy.
    #[serde(default)]
    pub matchers: Vec<MatcherRule>,
    /// Patterns determining relative upload order. Files matching an
    /// earlier-listed pattern upload first; this affects observability only
    /// (e.g. images visible before the HTML referencing them).
    #[serde(default)]
    pub order: Vec<String>,
    /// Abort before any deletion when more than this many remote objects
    /// would be removed. `-1` disables the guard.
    #[serde(default = "default_max_deletes")]
    pub max_deletes: i64,
    /// Attempts per upload, including the first.
    #[serde(default = "default_upload_attempts")]
    pub upload_attempts: u32,
}

fn default_max_deletes() -> i64 {
    256
}

fn default_upload_attempts() -> u32 {
    3
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            matchers: Vec::new(),
            order: Vec::new(),
            max_deletes: default_max_deletes(),
            upload_attempts: default_upload_attempts(),
        }
    }
}

impl PublishConfig {
    pub fn trace_loaded(&self) {
        info!(
            matchers = self.matchers.len(),
            order_rules = self.order.len(),
            max_deletes = self.max_deletes,
            "Loaded PublishConfig"
        );
        debug!(?self, "PublishConfig loaded (full debug)");
    }
}
