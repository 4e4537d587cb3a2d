/// `load_config` module: loads a static YAML site config into strongly-typed
/// structs shared with the core crate.
///
/// This module is the only place where untrusted YAML is parsed. Secrets
/// (AWS credentials) never live in the file; the SDK default chain picks
/// them up from the environment.
///
/// # Errors
/// All errors in this module use `anyhow::Error` for context-rich
/// diagnostics, and are surfaced at the CLI boundary.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use pagesync_core::config::PublishConfig;
use serde::Deserialize;
use tracing::{error, info};

/// Full site configuration: where the rendered output lives, where it goes,
/// and how it is published.
#[derive(Debug, Deserialize)]
pub struct SiteConfig {
    pub site: SiteSection,
    pub target: TargetSection,
    #[serde(default)]
    pub publish: PublishConfig,
}

#[derive(Debug, Deserialize)]
pub struct SiteSection {
    /// Local directory of rendered site files, read-only to the publisher.
    pub root: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct TargetSection {
    pub bucket: String,
    #[serde(default)]
    pub region: Option<String>,
    /// Key prefix inside the bucket, applied and stripped by the store.
    #[serde(default)]
    pub prefix: Option<String>,
    /// CloudFront distribution to invalidate after a run. `None` skips
    /// invalidation entirely.
    #[serde(default)]
    pub cloudfront_distribution: Option<String>,
}

/// Loads a static YAML config file (no secrets).
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SiteConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let config: SiteConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    config.publish.trace_loaded();

    Ok(config)
}
