//! Target selection over the configured (OS, architecture) matrix.
//!
//! Turns the matrix from [`MatrixConfig`](crate::config::MatrixConfig) plus
//! the CLI `--os`/`--arch` filters into the exact list of targets the
//! generate and build phases iterate. The selected set is the configured
//! cross-product restricted to both filters; empty filters select everything.
//!
//! Filter names that do not appear in the configuration are an error rather
//! than a silent no-op. A typo in `--arch` would otherwise drop targets
//! without any indication, or worse, build against a Dockerfile generated
//! for a different OS.
//!
//! Selection order is deterministic: OS names in sorted order, architecture
//! records in the order the config declares them.

use crate::config::MatrixConfig;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatrixError {
    #[error("unknown OS '{name}'; configured: {available}")]
    UnknownOs { name: String, available: String },
    #[error("unknown arch '{name}'; configured: {available}")]
    UnknownArch { name: String, available: String },
    #[error("selection is empty: none of the requested arches exist for the requested OSes")]
    EmptySelection,
}

/// One fully-resolved (OS, architecture) pair to generate and build.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    /// OS family name (config `[os.<name>]` key).
    pub os: String,
    /// Base image reference for the FROM line.
    pub base: String,
    /// CPU architecture name.
    pub arch: String,
    /// Secondary architecture tag (resolved, never empty).
    pub alt_arch: String,
}

impl Target {
    /// File name of the rendered Dockerfile for this target.
    ///
    /// Carries both OS and arch so no two targets collide.
    pub fn dockerfile_name(&self) -> String {
        format!("Dockerfile_{}_{}", self.os, self.arch)
    }
}

/// Select targets from the configured matrix, restricted by the filters.
///
/// Empty filters mean "everything configured". Every filter name must exist
/// in the configuration.
pub fn select_targets(
    config: &MatrixConfig,
    os_filter: &[String],
    arch_filter: &[String],
) -> Result<Vec<Target>, MatrixError> {
    for name in os_filter {
        if !config.os.contains_key(name) {
            return Err(MatrixError::UnknownOs {
                name: name.clone(),
                available: config.os.keys().cloned().collect::<Vec<_>>().join(", "),
            });
        }
    }
    let mut configured_arches: Vec<&str> = config
        .os
        .values()
        .flat_map(|os| os.images.iter().map(|r| r.arch.as_str()))
        .collect();
    configured_arches.sort_unstable();
    configured_arches.dedup();
    for name in arch_filter {
        if !configured_arches.contains(&name.as_str()) {
            return Err(MatrixError::UnknownArch {
                name: name.clone(),
                available: configured_arches.join(", "),
            });
        }
    }

    let mut targets = Vec::new();
    for (os_name, os) in &config.os {
        if !os_filter.is_empty() && !os_filter.iter().any(|f| f == os_name) {
            continue;
        }
        for record in &os.images {
            if !arch_filter.is_empty() && !arch_filter.iter().any(|f| f == &record.arch) {
                continue;
            }
            targets.push(Target {
                os: os_name.clone(),
                base: record.base.clone(),
                arch: record.arch.clone(),
                alt_arch: record.alt_arch().to_string(),
            });
        }
    }

    if targets.is_empty() {
        return Err(MatrixError::EmptySelection);
    }
    Ok(targets)
}
