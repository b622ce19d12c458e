//! Version string loading and normalization.
//!
//! The image version is read from a plain-text file (conventionally `VERSION`
//! in the repository root) rather than derived from git, so release branches
//! can pin exactly what lands in the image tag. Branch-style strings like
//! `release/5.8` are normalized to `release-5.8` because `/` is not a valid
//! character in a docker tag.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VersionError {
    #[error("Version file not found: {0}")]
    Missing(PathBuf),
    #[error("Version file is empty: {0}")]
    Empty(PathBuf),
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Read and normalize the version string from a file.
///
/// The file content is trimmed and any `release/` prefix becomes `release-`:
/// - `"v5.8.1\n"` → `"v5.8.1"`
/// - `"release/5.8"` → `"release-5.8"`
pub fn read_version(path: &Path) -> Result<String, VersionError> {
    if !path.exists() {
        return Err(VersionError::Missing(path.to_path_buf()));
    }
    let raw = fs::read_to_string(path).map_err(|source| VersionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let version = normalize(&raw);
    if version.is_empty() {
        return Err(VersionError::Empty(path.to_path_buf()));
    }
    Ok(version)
}

/// Trim whitespace and make the string tag-safe.
pub fn normalize(raw: &str) -> String {
    raw.trim().replace("release/", "release-")
}
