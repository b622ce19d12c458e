//! External command invocation seam.
//!
//! The [`Invoker`] trait is the one place the crate touches the operating
//! system's process-execution interface. The production implementation is
//! [`CliInvoker`], which runs the real `docker` CLI; tests use the recording
//! mock in [`tests`] so pipeline logic can be exercised without a docker
//! daemon.
//!
//! Every invocation blocks until the child exits. With `verbose` the child
//! inherits the console and its output streams live; otherwise output is
//! captured and handed back to the caller, which reports it only on failure.

use std::process::{Command, Stdio};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InvokeError {
    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
}

/// Outcome of one external command, run to completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandStatus {
    pub success: bool,
    /// Process exit code, if the process exited normally.
    pub code: Option<i32>,
    /// Captured combined stdout/stderr; `None` when streaming to the console.
    pub output: Option<String>,
}

impl CommandStatus {
    /// A successful, stream-to-console outcome. Handy in tests.
    pub fn ok() -> Self {
        Self {
            success: true,
            code: Some(0),
            output: None,
        }
    }

    /// A failed outcome with the given exit code.
    pub fn failed(code: i32) -> Self {
        Self {
            success: false,
            code: Some(code),
            output: None,
        }
    }
}

/// Trait for running external commands.
pub trait Invoker {
    /// Run `program` with `args`, blocking until it exits.
    fn invoke(&self, program: &str, args: &[String]) -> Result<CommandStatus, InvokeError>;
}

/// Production invoker: spawns the real process.
pub struct CliInvoker {
    /// Stream child output to the console instead of capturing it.
    pub verbose: bool,
}

impl Invoker for CliInvoker {
    fn invoke(&self, program: &str, args: &[String]) -> Result<CommandStatus, InvokeError> {
        let spawn_err = |source| InvokeError::Spawn {
            program: program.to_string(),
            source,
        };
        if self.verbose {
            let status = Command::new(program)
                .args(args)
                .stdin(Stdio::null())
                .status()
                .map_err(spawn_err)?;
            Ok(CommandStatus {
                success: status.success(),
                code: status.code(),
                output: None,
            })
        } else {
            let out = Command::new(program)
                .args(args)
                .stdin(Stdio::null())
                .output()
                .map_err(spawn_err)?;
            let mut combined = String::from_utf8_lossy(&out.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&out.stderr));
            Ok(CommandStatus {
                success: out.status.success(),
                code: out.status.code(),
                output: Some(combined),
            })
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// One recorded invocation, program plus full argument vector.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Invocation {
        pub program: String,
        pub args: Vec<String>,
    }

    /// Mock invoker that records invocations without spawning anything.
    ///
    /// Preset results are popped per call; when exhausted, calls succeed.
    #[derive(Default)]
    pub struct MockInvoker {
        pub results: Mutex<Vec<CommandStatus>>,
        pub invocations: Mutex<Vec<Invocation>>,
    }

    impl MockInvoker {
        pub fn new() -> Self {
            Self::default()
        }

        /// Mock whose next calls return the given statuses, in order.
        pub fn with_results(mut results: Vec<CommandStatus>) -> Self {
            // Popped from the back; store reversed so callers list in order.
            results.reverse();
            Self {
                results: Mutex::new(results),
                invocations: Mutex::new(Vec::new()),
            }
        }

        pub fn recorded(&self) -> Vec<Invocation> {
            self.invocations.lock().unwrap().clone()
        }
    }

    impl Invoker for MockInvoker {
        fn invoke(&self, program: &str, args: &[String]) -> Result<CommandStatus, InvokeError> {
            self.invocations.lock().unwrap().push(Invocation {
                program: program.to_string(),
                args: args.to_vec(),
            });
            Ok(self
                .results
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(CommandStatus::ok))
        }
    }

    #[test]
    fn mock_records_invocations_in_order() {
        let mock = MockInvoker::new();
        mock.invoke("docker", &["build".to_string()]).unwrap();
        mock.invoke("docker", &["tag".to_string()]).unwrap();

        let recorded = mock.recorded();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].args, vec!["build"]);
        assert_eq!(recorded[1].args, vec!["tag"]);
    }

    #[test]
    fn mock_pops_preset_results_in_order() {
        let mock =
            MockInvoker::with_results(vec![CommandStatus::failed(1), CommandStatus::ok()]);
        assert!(!mock.invoke("docker", &[]).unwrap().success);
        assert!(mock.invoke("docker", &[]).unwrap().success);
        // Exhausted presets default to success
        assert!(mock.invoke("docker", &[]).unwrap().success);
    }

    #[test]
    fn cli_invoker_reports_success() {
        let invoker = CliInvoker { verbose: false };
        // 'true' exists on any Unix system
        let status = invoker.invoke("true", &[]).unwrap();
        assert!(status.success);
    }

    #[test]
    fn cli_invoker_reports_failure_code() {
        let invoker = CliInvoker { verbose: false };
        let status = invoker.invoke("false", &[]).unwrap();
        assert!(!status.success);
        assert_eq!(status.code, Some(1));
    }

    #[test]
    fn cli_invoker_captures_output_when_not_verbose() {
        let invoker = CliInvoker { verbose: false };
        let status = invoker.invoke("echo", &["hello".to_string()]).unwrap();
        assert!(status.output.unwrap().contains("hello"));
    }

    #[test]
    fn cli_invoker_spawn_error_for_missing_program() {
        let invoker = CliInvoker { verbose: false };
        let err = invoker
            .invoke("definitely_not_a_real_command_12345", &[])
            .unwrap_err();
        assert!(err.to_string().contains("definitely_not_a_real_command"));
    }
}
