//! Matrix configuration module.
//!
//! Handles loading, validating, and merging `buildmatrix.toml`. Stock
//! defaults are compiled in; a user config file overrides them key by key.
//!
//! ## Config File Shape
//!
//! ```toml
//! [image]
//! name = "example/app"          # Registry image reference
//! maintainer = "builds@example.com"
//!
//! [vars]                        # Free-form global template variables
//! s6_version = "v1.22.1.0"
//!
//! [os.debian.vars]              # Per-OS variables, override globals
//! pkg_install = "apt-get install -y"
//!
//! [[os.debian.image]]           # One record per target architecture
//! base = "debian:stretch-slim"
//! arch = "amd64"
//!
//! [[os.debian.image]]
//! base = "multiarch/debian-debootstrap:arm64-stretch-slim"
//! arch = "arm64"
//! alt_arch = "aarch64"          # Optional; defaults to arch
//! ```
//!
//! ## Partial Configuration
//!
//! `[image]` and `[vars]` are sparse overrides. The `os` table is the one
//! exception: if a user config defines any `[os.*]` section, the stock matrix
//! is replaced wholesale. Key-by-key merging of the matrix would make it
//! impossible to drop a stock OS from a user config.
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Build matrix configuration loaded from `buildmatrix.toml`.
///
/// All fields have stock defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatrixConfig {
    /// Image identity (registry reference, maintainer label).
    pub image: ImageConfig,
    /// Global template variables, available in every render.
    pub vars: BTreeMap<String, String>,
    /// Target OS families and their architecture records.
    pub os: BTreeMap<String, OsConfig>,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            image: ImageConfig::default(),
            vars: default_global_vars(),
            os: default_matrix(),
        }
    }
}

impl MatrixConfig {
    /// Final path segment of the registry reference, used as the local
    /// image repository (`example/app` → `app`).
    pub fn short_name(&self) -> &str {
        self.image
            .name
            .rsplit('/')
            .next()
            .unwrap_or(&self.image.name)
    }

    /// Validate config values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.image.name.is_empty() {
            return Err(ConfigError::Validation(
                "image.name must not be empty".into(),
            ));
        }
        if self.image.name.chars().any(char::is_whitespace) {
            return Err(ConfigError::Validation(
                "image.name must not contain whitespace".into(),
            ));
        }
        if self.os.is_empty() {
            return Err(ConfigError::Validation(
                "at least one [os.*] section is required".into(),
            ));
        }
        for (name, os) in &self.os {
            if os.images.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "os.{name} must define at least one [[os.{name}.image]] record"
                )));
            }
            let mut seen = std::collections::BTreeSet::new();
            for record in &os.images {
                if record.arch.is_empty() {
                    return Err(ConfigError::Validation(format!(
                        "os.{name} has an image record with an empty arch"
                    )));
                }
                if record.base.is_empty() {
                    return Err(ConfigError::Validation(format!(
                        "os.{name}/{} has an empty base image",
                        record.arch
                    )));
                }
                if !seen.insert(record.arch.as_str()) {
                    return Err(ConfigError::Validation(format!(
                        "duplicate arch '{}' in os.{name}",
                        record.arch
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Image identity settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageConfig {
    /// Registry image reference, e.g. `example/app`. Doubles as the
    /// `--cache-from` source and the `name` template variable.
    pub name: String,
    /// Maintainer string, exposed to the template.
    pub maintainer: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            name: "example/app".to_string(),
            maintainer: "builds@example.com".to_string(),
        }
    }
}

/// One target OS family: its template variables and architecture records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OsConfig {
    /// Per-OS template variables. Override global `[vars]` of the same key.
    pub vars: BTreeMap<String, String>,
    /// Architecture records, in declared order.
    #[serde(rename = "image")]
    pub images: Vec<ArchImage>,
}

/// One (base image, architecture) record within an OS family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchImage {
    /// Base image reference for the FROM line.
    pub base: String,
    /// CPU architecture name. Part of the generated file name and image tag.
    pub arch: String,
    /// Secondary architecture tag exposed to the template, for artifacts
    /// that name architectures differently (e.g. s6-overlay says `aarch64`
    /// where docker says `arm64`). Defaults to `arch`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_arch: Option<String>,
}

impl ArchImage {
    /// The secondary architecture tag, falling back to `arch`.
    pub fn alt_arch(&self) -> &str {
        self.alt_arch.as_deref().unwrap_or(&self.arch)
    }
}

fn default_global_vars() -> BTreeMap<String, String> {
    BTreeMap::from([("s6_version".to_string(), "v1.22.1.0".to_string())])
}

fn default_matrix() -> BTreeMap<String, OsConfig> {
    let record = |base: &str, arch: &str, alt: Option<&str>| ArchImage {
        base: base.to_string(),
        arch: arch.to_string(),
        alt_arch: alt.map(str::to_string),
    };
    BTreeMap::from([
        (
            "alpine".to_string(),
            OsConfig {
                vars: BTreeMap::from([(
                    "pkg_install".to_string(),
                    "apk add --no-cache".to_string(),
                )]),
                images: vec![
                    record("alpine:edge", "amd64", None),
                    record("multiarch/alpine:armhf-edge", "armhf", Some("arm")),
                    record("multiarch/alpine:arm64-edge", "arm64", Some("aarch64")),
                ],
            },
        ),
        (
            "debian".to_string(),
            OsConfig {
                vars: BTreeMap::from([(
                    "pkg_install".to_string(),
                    "apt-get install -y".to_string(),
                )]),
                images: vec![
                    record("debian:stretch-slim", "amd64", None),
                    record(
                        "multiarch/debian-debootstrap:armel-stretch-slim",
                        "armel",
                        Some("arm"),
                    ),
                    record(
                        "multiarch/debian-debootstrap:armhf-stretch-slim",
                        "armhf",
                        Some("arm"),
                    ),
                    record(
                        "multiarch/debian-debootstrap:arm64-stretch-slim",
                        "arm64",
                        Some("aarch64"),
                    ),
                ],
            },
        ),
    ])
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(MatrixConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
///
/// A user-supplied `os` table replaces the base matrix wholesale; everything
/// else merges key-by-key.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<MatrixConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => {
            let base = match (&ov, base) {
                (toml::Value::Table(ov_table), toml::Value::Table(mut base_table))
                    if ov_table.contains_key("os") =>
                {
                    base_table.remove("os");
                    toml::Value::Table(base_table)
                }
                (_, base) => base,
            };
            merge_toml(base, ov)
        }
        None => base,
    };
    let config: MatrixConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the given path.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the stock defaults.
pub fn load_config(path: &Path) -> Result<MatrixConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `buildmatrix.toml` with all keys explained.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# buildmatrix configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# [image] and [vars] merge key-by-key onto the stock defaults. The [os.*]
# sections are different: defining any of them replaces the stock matrix
# entirely, so list every OS you want to build.

[image]
# Registry image reference. Used as the --cache-from source, and its final
# path segment becomes the local image repository for build tags.
name = "example/app"

# Maintainer string, exposed to the template as {{ maintainer }}.
maintainer = "builds@example.com"

# ---------------------------------------------------------------------------
# Global template variables
# ---------------------------------------------------------------------------
# Free-form strings, available in every render. Per-OS vars of the same key
# take precedence.
[vars]
s6_version = "v1.22.1.0"

# ---------------------------------------------------------------------------
# Matrix: one [os.<name>] section per OS family
# ---------------------------------------------------------------------------
[os.alpine.vars]
pkg_install = "apk add --no-cache"

[[os.alpine.image]]
base = "alpine:edge"
arch = "amd64"

[[os.alpine.image]]
base = "multiarch/alpine:armhf-edge"
arch = "armhf"
alt_arch = "arm"       # Secondary arch tag ({{ alt_arch }}); defaults to arch

[[os.alpine.image]]
base = "multiarch/alpine:arm64-edge"
arch = "arm64"
alt_arch = "aarch64"

[os.debian.vars]
pkg_install = "apt-get install -y"

[[os.debian.image]]
base = "debian:stretch-slim"
arch = "amd64"

[[os.debian.image]]
base = "multiarch/debian-debootstrap:armel-stretch-slim"
arch = "armel"
alt_arch = "arm"

[[os.debian.image]]
base = "multiarch/debian-debootstrap:armhf-stretch-slim"
arch = "armhf"
alt_arch = "arm"

[[os.debian.image]]
base = "multiarch/debian-debootstrap:arm64-stretch-slim"
arch = "arm64"
alt_arch = "aarch64"
"##
}
