use buildmatrix::build::BuildOptions;
use buildmatrix::docker::CliInvoker;
use buildmatrix::{config, matrix, pipeline, preflight, render, version};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Shared target selection flags.
#[derive(clap::Args, Clone)]
struct SelectArgs {
    /// Restrict to these OS families (repeatable; default: all configured)
    #[arg(long = "os", value_name = "OS")]
    os: Vec<String>,

    /// Restrict to these architectures (repeatable; default: all configured)
    #[arg(long = "arch", value_name = "ARCH")]
    arch: Vec<String>,
}

/// Shared flags for commands that invoke docker.
#[derive(clap::Args, Clone)]
struct BuildArgs {
    /// Additionally docker-tag each built image as this reference
    #[arg(long, value_name = "TAG")]
    hub_tag: Option<String>,

    /// Build without using any cache data
    #[arg(long)]
    no_cache: bool,

    /// Print wall-clock duration per target
    #[arg(short = 't', long)]
    timing: bool,
}

impl BuildArgs {
    fn to_options(&self) -> BuildOptions {
        BuildOptions {
            no_cache: self.no_cache,
            hub_tag: self.hub_tag.clone(),
            timing: self.timing,
        }
    }
}

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup — trivial, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "buildmatrix")]
#[command(about = "Generate Dockerfiles per OS/arch pair and build the images")]
#[command(long_about = "\
Generate Dockerfiles per OS/arch pair and build the images

One Tera template plus a TOML matrix of (OS, architecture) records becomes
one Dockerfile per pair; docker then builds and optionally re-tags each
result, sequentially.

Inputs (all paths overridable):

  buildmatrix.toml        # Matrix config (optional, stock defaults apply)
  Dockerfile.template     # Tera template, rendered once per target
  VERSION                 # Image version string ('release/x' → 'release-x')

Per selected target <os>/<arch> this renders Dockerfile_<os>_<arch> and runs:

  docker build [--no-cache] --pull \\
      --cache-from=<name>:<ver>_<os>_<arch>,<short>:<ver>_<os>_<arch> \\
      -f Dockerfile_<os>_<arch> -t <short>:<ver>_<os>_<arch> .
  docker tag <short>:<ver>_<os>_<arch> <hub tag>     # with --hub-tag

Run 'buildmatrix gen-config' to print a documented buildmatrix.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Matrix config file
    #[arg(long, default_value = "buildmatrix.toml", global = true)]
    config: PathBuf,

    /// Dockerfile template
    #[arg(long, default_value = "Dockerfile.template", global = true)]
    template: PathBuf,

    /// File containing the image version string
    #[arg(long, default_value = "VERSION", global = true)]
    version_file: PathBuf,

    /// Directory for generated Dockerfiles
    #[arg(long, default_value = ".", global = true)]
    output: PathBuf,

    /// Stream docker command output to the console
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render Dockerfiles for the selected targets
    Generate {
        #[command(flatten)]
        select: SelectArgs,
    },
    /// Build and optionally tag previously generated Dockerfiles
    Build {
        #[command(flatten)]
        select: SelectArgs,
        #[command(flatten)]
        build: BuildArgs,
    },
    /// Run the full pipeline: generate then build
    Run {
        #[command(flatten)]
        select: SelectArgs,
        #[command(flatten)]
        build: BuildArgs,
        /// Skip generating Dockerfiles from the template
        #[arg(long)]
        no_generate: bool,
        /// Skip building the docker images
        #[arg(long)]
        no_build: bool,
    },
    /// Validate config, template, version file, and host tools
    Check,
    /// Print a stock buildmatrix.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.command {
        Command::Generate { select } => {
            let options = pipeline::RunOptions {
                no_build: true,
                ..Default::default()
            };
            run_pipeline(&cli, select, options)
        }
        Command::Build { select, build } => {
            let options = pipeline::RunOptions {
                no_generate: true,
                build: build.to_options(),
                ..Default::default()
            };
            run_pipeline(&cli, select, options)
        }
        Command::Run {
            select,
            build,
            no_generate,
            no_build,
        } => {
            let options = pipeline::RunOptions {
                no_generate: *no_generate,
                no_build: *no_build,
                build: build.to_options(),
            };
            run_pipeline(&cli, select, options)
        }
        Command::Check => check(&cli),
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            Ok(())
        }
    }
}

/// Load inputs, select targets, and hand off to the pipeline.
fn run_pipeline(
    cli: &Cli,
    select: &SelectArgs,
    options: pipeline::RunOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_config(&cli.config)?;
    let version = version::read_version(&cli.version_file)?;
    let targets = matrix::select_targets(&config, &select.os, &select.arch)?;
    if !options.no_build {
        preflight::check_host_tools()?;
    }

    let invoker = CliInvoker {
        verbose: cli.verbose,
    };
    let summary = pipeline::run(
        &config,
        &targets,
        &version,
        &cli.template,
        &cli.output,
        &options,
        &invoker,
    )?;

    match summary.failures() {
        0 => Ok(()),
        n => Err(format!("{n} of {} builds failed", summary.built.len()).into()),
    }
}

/// Validate every input without writing files or spawning docker builds.
fn check(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    println!("==> Checking {}", cli.config.display());
    let config = config::load_config(&cli.config)?;
    let targets = matrix::select_targets(&config, &[], &[])?;
    println!(
        "Config: {} ({} OSes, {} targets)",
        config.image.name,
        config.os.len(),
        targets.len()
    );

    let version = version::read_version(&cli.version_file)?;
    println!("Version: {version}");

    if !cli.template.exists() {
        return Err(render::RenderError::MissingTemplate(cli.template.clone()).into());
    }
    println!("Template: {}", cli.template.display());

    preflight::check_host_tools()?;
    println!("Docker: ok");
    println!("==> All checks passed");
    Ok(())
}
