//! Full pipeline: generate, then build, with skip toggles.
//!
//! Runs the two phases in order over one target selection. `--no-generate`
//! suppresses the render phase entirely (no file is written) and
//! `--no-build` suppresses the invoke phase entirely (no process is
//! spawned); both can be combined. Targets are processed strictly
//! sequentially, each docker invocation run to completion before the next.
//!
//! Per-target build failures do not stop the loop. They are reported as they
//! happen and counted in the returned [`Summary`]; the caller decides the
//! process exit status.

use crate::build::{BuildOptions, BuiltImage, build_target};
use crate::config::MatrixConfig;
use crate::docker::{InvokeError, Invoker};
use crate::matrix::Target;
use crate::output;
use crate::render::{GeneratedFile, RenderError, generate};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Invoke(#[from] InvokeError),
}

/// Flags for a full run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Skip the render phase.
    pub no_generate: bool,
    /// Skip the invoke phase.
    pub no_build: bool,
    pub build: BuildOptions,
}

/// What a run produced.
#[derive(Debug, Default)]
pub struct Summary {
    pub generated: Vec<GeneratedFile>,
    pub built: Vec<BuiltImage>,
}

impl Summary {
    /// Number of targets whose build or tag failed.
    pub fn failures(&self) -> usize {
        self.built
            .iter()
            .filter(|b| !b.outcome.is_success())
            .count()
    }
}

/// Run the pipeline over the selected targets.
///
/// Returns `Ok` even when individual builds fail; check
/// [`Summary::failures`]. Errors are reserved for conditions that abort the
/// run: render problems and processes that cannot be spawned at all.
pub fn run(
    config: &MatrixConfig,
    targets: &[Target],
    version: &str,
    template_path: &Path,
    output_dir: &Path,
    options: &RunOptions,
    invoker: &dyn Invoker,
) -> Result<Summary, PipelineError> {
    let mut summary = Summary::default();

    if options.no_generate {
        println!("==> Skipping Dockerfile generation");
    } else {
        println!("==> Generating Dockerfiles");
        summary.generated = generate(config, targets, version, template_path, output_dir)?;
        output::print_generate_output(&summary.generated);
    }

    if options.no_build {
        println!("==> Skipping image builds");
        return Ok(summary);
    }

    println!("==> Building images");
    for (i, target) in targets.iter().enumerate() {
        let tag = crate::build::local_tag(config, version, target);
        println!(
            "{}",
            output::format_build_start(i + 1, &target.os, &target.arch, &tag)
        );
        let built = build_target(
            config,
            target,
            version,
            &options.build,
            output_dir,
            invoker,
        )?;
        for line in output::format_build_result(
            &built,
            options.build.hub_tag.as_deref(),
            options.build.timing,
        ) {
            println!("{line}");
        }
        summary.built.push(built);
    }
    for line in output::format_build_summary(&summary.built) {
        println!("{line}");
    }

    Ok(summary)
}
