//! Docker build and tag invocation.
//!
//! Invoke phase of the pipeline. For each target this runs, sequentially and
//! to completion:
//!
//! ```text
//! docker build [--no-cache] --pull \
//!     --cache-from=<name>:<version>_<os>_<arch>,<short>:<version>_<os>_<arch> \
//!     -f <output>/Dockerfile_<os>_<arch> -t <short>:<version>_<os>_<arch> .
//! docker tag <local tag> <hub tag>        # only with --hub-tag
//! ```
//!
//! `<short>` is the final path segment of `image.name`, so local tags stay
//! short while `--cache-from` can pull layer caches from the registry
//! reference. Argument vectors are assembled by pure functions and handed to
//! the [`Invoker`] seam, which keeps every command shape unit-testable
//! without a docker daemon.

use crate::config::MatrixConfig;
use crate::docker::{InvokeError, Invoker};
use crate::matrix::Target;
use std::path::Path;
use std::time::{Duration, Instant};

/// Flags for the invoke phase.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Pass `--no-cache` to docker build.
    pub no_cache: bool,
    /// Additionally `docker tag` each built image as this reference.
    pub hub_tag: Option<String>,
    /// Report wall-clock duration per docker invocation.
    pub timing: bool,
}

/// Result of building (and optionally tagging) one target.
#[derive(Debug, Clone)]
pub struct BuiltImage {
    pub os: String,
    pub arch: String,
    /// The local tag the image was built as.
    pub tag: String,
    pub outcome: BuildOutcome,
    /// Wall-clock time spent in docker, build plus tag.
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BuildOutcome {
    /// Build succeeded; `hub_tagged` records whether a tag was applied.
    Built { hub_tagged: bool },
    /// `docker build` exited nonzero. Captured output, when not streaming.
    Failed {
        code: Option<i32>,
        output: Option<String>,
    },
    /// Build succeeded but `docker tag` exited nonzero.
    TagFailed {
        code: Option<i32>,
        output: Option<String>,
    },
}

impl BuildOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BuildOutcome::Built { .. })
    }
}

/// Local build tag: `<short>:<version>_<os>_<arch>`.
pub fn local_tag(config: &MatrixConfig, version: &str, target: &Target) -> String {
    format!(
        "{}:{}_{}_{}",
        config.short_name(),
        version,
        target.os,
        target.arch
    )
}

/// Registry cache reference: `<image.name>:<version>_<os>_<arch>`.
pub fn cache_image(config: &MatrixConfig, version: &str, target: &Target) -> String {
    format!(
        "{}:{}_{}_{}",
        config.image.name, version, target.os, target.arch
    )
}

/// Argument vector for `docker build` against one target.
pub fn build_args(
    config: &MatrixConfig,
    version: &str,
    target: &Target,
    output_dir: &Path,
    no_cache: bool,
) -> Vec<String> {
    let tag = local_tag(config, version, target);
    let cache = cache_image(config, version, target);
    let dockerfile = output_dir.join(target.dockerfile_name());
    let mut args = vec!["build".to_string()];
    if no_cache {
        args.push("--no-cache".to_string());
    }
    args.extend([
        "--pull".to_string(),
        format!("--cache-from={cache},{tag}"),
        "-f".to_string(),
        dockerfile.to_string_lossy().into_owned(),
        "-t".to_string(),
        tag,
        ".".to_string(),
    ]);
    args
}

/// Argument vector for `docker tag`.
pub fn tag_args(local: &str, hub_tag: &str) -> Vec<String> {
    vec!["tag".to_string(), local.to_string(), hub_tag.to_string()]
}

/// Build one target, then apply the hub tag if requested.
///
/// A nonzero exit is recorded in the outcome, not returned as an error;
/// only a failure to spawn the process at all aborts.
pub fn build_target(
    config: &MatrixConfig,
    target: &Target,
    version: &str,
    options: &BuildOptions,
    output_dir: &Path,
    invoker: &dyn Invoker,
) -> Result<BuiltImage, InvokeError> {
    let tag = local_tag(config, version, target);
    let started = Instant::now();

    let args = build_args(config, version, target, output_dir, options.no_cache);
    let status = invoker.invoke("docker", &args)?;
    if !status.success {
        return Ok(BuiltImage {
            os: target.os.clone(),
            arch: target.arch.clone(),
            tag,
            outcome: BuildOutcome::Failed {
                code: status.code,
                output: status.output,
            },
            duration: started.elapsed(),
        });
    }

    let outcome = match &options.hub_tag {
        Some(hub_tag) => {
            let status = invoker.invoke("docker", &tag_args(&tag, hub_tag))?;
            if status.success {
                BuildOutcome::Built { hub_tagged: true }
            } else {
                BuildOutcome::TagFailed {
                    code: status.code,
                    output: status.output,
                }
            }
        }
        None => BuildOutcome::Built { hub_tagged: false },
    };

    Ok(BuiltImage {
        os: target.os.clone(),
        arch: target.arch.clone(),
        tag,
        outcome,
        duration: started.elapsed(),
    })
}
