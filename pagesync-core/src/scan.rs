//! Local side of the diff: walking the rendered site and preparing upload
//! bodies.
//!
//! The content hash of a file is the hex MD5 of the exact bytes that would
//! be uploaded (gzip applied first when the route says so), which makes it
//! directly comparable with the ETag S3 reports for a simple put of the same
//! body.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use flate2::write::GzEncoder;
use flate2::Compression;
use md5::{Digest, Md5};
use tracing::debug;

use crate::error::PublishError;

/// A file discovered under the publish root. Transient, recomputed each run.
#[derive(Debug, Clone)]
pub struct LocalFile {
    /// Path relative to the publish root, slash-separated.
    pub key: String,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

/// Walk the publish root, returning regular files sorted by key.
///
/// Hidden entries (leading dot) are skipped at every level; the rendered
/// output of a site generator never legitimately contains them.
pub fn scan_dir(root: &Path) -> Result<Vec<LocalFile>, PublishError> {
    let mut files = Vec::new();
    walk(root, root, &mut files)?;
    files.sort_by(|a, b| a.key.cmp(&b.key));
    debug!(root = %root.display(), files = files.len(), "Scanned publish root");
    Ok(files)
}

fn walk(root: &Path, dir: &Path, files: &mut Vec<LocalFile>) -> Result<(), PublishError> {
    let entries = fs::read_dir(dir).map_err(|source| PublishError::Scan {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| PublishError::Scan {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();

        if is_hidden(&path) {
            debug!(path = %path.display(), "Skipping hidden entry");
            continue;
        }

        let metadata = fs::metadata(&path).map_err(|source| PublishError::Scan {
            path: path.clone(),
            source,
        })?;

        if metadata.is_dir() {
            walk(root, &path, files)?;
        } else if metadata.is_file() {
            files.push(LocalFile {
                key: relative_key(root, &path),
                size: metadata.len(),
                modified: metadata.modified().ok(),
            });
        }
    }

    Ok(())
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Slash-separated key for a path under `root`, regardless of platform.
fn relative_key(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Read and prepare the exact bytes to store for a key.
///
/// Gzip output here is deterministic (fixed compression level, zeroed
/// header timestamp), so hashing the prepared body stays stable across runs.
pub fn upload_body(root: &Path, key: &str, gzip: bool) -> Result<Vec<u8>, PublishError> {
    let path: PathBuf = root.join(key);
    let raw = fs::read(&path).map_err(|source| PublishError::Scan { path, source })?;

    if !gzip {
        return Ok(raw);
    }

    let mut encoder = GzEncoder::new(Vec::with_capacity(raw.len()), Compression::default());
    encoder
        .write_all(&raw)
        .and_then(|_| encoder.finish())
        .map_err(|source| PublishError::Scan {
            path: root.join(key),
            source,
        })
}

/// Hex MD5 of a prepared upload body.
pub fn body_hash(body: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(body);
    format!("{:x}", hasher.finalize())
}

/// Content type by file extension, covering the static-site set.
pub fn content_type_for(key: &str) -> &'static str {
    let extension = key.rsplit('.').next().unwrap_or("");
    match extension {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "txt" => "text/plain; charset=utf-8",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "eot" => "application/vnd.ms-fontobject",
        "pdf" => "application/pdf",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}
