//! Preflight checks for the host system.
//!
//! Validates that the `docker` CLI is available before the invoke phase
//! starts. A missing binary would otherwise surface as a spawn error halfway
//! through a run, after Dockerfiles were already written.

use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PreflightError {
    #[error("missing required host tools:\n{0}")]
    MissingTools(String),
}

/// Host tools the invoke phase needs. Each tuple is (command, package).
pub const REQUIRED_TOOLS: &[(&str, &str)] = &[("docker", "docker")];

/// Check if a command exists on the host system.
///
/// Uses `which` to locate the command in PATH.
pub fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Check that specific tools are available.
pub fn check_required_tools(tools: &[(&str, &str)]) -> Result<(), PreflightError> {
    let missing: Vec<String> = tools
        .iter()
        .filter(|(tool, _)| !command_exists(tool))
        .map(|(tool, package)| format!("  {tool} (install: {package})"))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PreflightError::MissingTools(missing.join("\n")))
    }
}

/// Check that everything in [`REQUIRED_TOOLS`] is available.
pub fn check_host_tools() -> Result<(), PreflightError> {
    check_required_tools(REQUIRED_TOOLS)
}
