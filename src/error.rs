//! Top-level error type for the `toolrun` binary and library facade

use std::path::PathBuf;

use thiserror::Error;

use crate::exit_codes::ExitCode;
use toolrun_args::{ArgumentError, ValidationError};
use toolrun_config::ConfigError;
use toolrun_runner::{RunError, RunErrorKind, RunOutcome};

/// Errors that carry enough context to be shown to a user
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;
}

#[derive(Error, Debug)]
pub enum ToolrunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Config file could not be read or parsed. Holds the full context chain.
    #[error("{0}")]
    ConfigLoad(String),

    #[error(transparent)]
    Argument(#[from] ArgumentError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Input directory not found: {}", .0.display())]
    MissingInput(PathBuf),

    /// Output of a staged run could not be copied back. The staged
    /// directory is kept and still holds everything the tool wrote.
    #[error("{source} (run output kept in {})", .workdir.display())]
    Collect {
        workdir: PathBuf,
        outcome: Box<RunOutcome>,
        #[source]
        source: Box<ToolrunError>,
    },
}

impl ToolrunError {
    /// Wrap an I/O error with a short description of what was being done.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Map the error onto the documented exit code table.
    #[must_use]
    pub fn to_exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_) | Self::ConfigLoad(_) | Self::Argument(_) | Self::MissingInput(_) => {
                ExitCode::CLI_ARGS
            }
            Self::Validation(_) => ExitCode::VALIDATION,
            Self::Run(err) => run_exit_code(err),
            Self::Io { .. } => ExitCode::INTERNAL,
            Self::Collect { outcome, source, .. } => match &outcome.error {
                Some(err) => run_exit_code(err),
                None => source.to_exit_code(),
            },
        }
    }

    /// Convert a config loading failure, keeping its context chain.
    #[must_use]
    pub fn config_load(err: &anyhow::Error) -> Self {
        Self::ConfigLoad(format!("{err:#}"))
    }
}

fn run_exit_code(err: &RunError) -> ExitCode {
    match err {
        RunError::Validation { .. } => ExitCode::VALIDATION,
        RunError::PermissionDenied { .. } => ExitCode::PERMISSION_DENIED,
        RunError::Launch { .. } => ExitCode::LAUNCH_FAILURE,
        RunError::Timeout { .. } => ExitCode::TIMEOUT,
        RunError::Cancelled { .. } => ExitCode::CANCELLED,
        RunError::Execution { .. } => ExitCode::TOOL_FAILURE,
    }
}

impl UserFriendlyError for ToolrunError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(err) => format!("Configuration is invalid: {err}"),
            Self::ConfigLoad(reason) => format!("Configuration could not be loaded: {reason}"),
            Self::Argument(err) => format!("Argument value rejected: {err}"),
            Self::Validation(err) => format!("Command is incomplete: {err}"),
            Self::Run(err) => match err.kind() {
                RunErrorKind::Validation => format!("Command is incomplete: {err}"),
                RunErrorKind::Launch | RunErrorKind::Execution => err.full_message(),
            },
            Self::Io { .. } | Self::MissingInput(_) => self.to_string(),
            Self::Collect { outcome, .. } => match outcome.error_message() {
                Some(run) => format!("{self}\n{run}"),
                None => self.to_string(),
            },
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(_) | Self::ConfigLoad(_) => vec![
                "Check .toolrun/config.toml for typos and unknown keys".to_string(),
                "Run 'toolrun config' to see the effective configuration".to_string(),
            ],
            Self::Argument(_) => vec![
                "Check the persisted values in the [arguments] table of the config file"
                    .to_string(),
            ],
            Self::Validation(_) => Vec::new(),
            Self::Run(RunError::PermissionDenied { program, .. }) => vec![format!(
                "Make sure '{program}' is executable (chmod +x)"
            )],
            Self::Run(RunError::Launch { program, .. }) => vec![
                format!("Check that '{program}' is installed and on PATH"),
                "Set [tool] conda_env if the tool lives in a conda environment".to_string(),
            ],
            Self::Run(RunError::Timeout { .. }) => vec![
                "Raise [runner] timeout_secs or pass --timeout".to_string(),
            ],
            Self::Run(RunError::Execution { .. }) => vec![
                "Inspect the tool log printed above".to_string(),
                "Pass --no-check-exit-code to accept nonzero exits".to_string(),
            ],
            Self::Run(RunError::Validation { .. } | RunError::Cancelled { .. }) => Vec::new(),
            Self::Io { .. } => Vec::new(),
            Self::MissingInput(_) => {
                vec!["Pass a directory containing img-t<N>.tif frames".to_string()]
            }
            Self::Collect { workdir, .. } => vec![format!(
                "Copy results and the log out of {} by hand, then remove it",
                workdir.display()
            )],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_run_errors_map_to_exit_codes() {
        let cases = [
            (
                RunError::Validation {
                    message: "missing".into(),
                },
                ExitCode::VALIDATION,
            ),
            (
                RunError::PermissionDenied {
                    program: "delta".into(),
                    log: String::new(),
                },
                ExitCode::PERMISSION_DENIED,
            ),
            (
                RunError::Launch {
                    program: "delta".into(),
                    reason: "not found".into(),
                    log: String::new(),
                },
                ExitCode::LAUNCH_FAILURE,
            ),
            (
                RunError::Timeout {
                    program: "delta".into(),
                    timeout: Duration::from_secs(5),
                    log: String::new(),
                },
                ExitCode::TIMEOUT,
            ),
            (
                RunError::Cancelled {
                    program: "delta".into(),
                    log: String::new(),
                },
                ExitCode::CANCELLED,
            ),
            (
                RunError::Execution {
                    program: "delta".into(),
                    reason: "exited with exit status: 1".into(),
                    exit_code: Some(1),
                    log: String::new(),
                },
                ExitCode::TOOL_FAILURE,
            ),
        ];

        for (err, code) in cases {
            assert_eq!(ToolrunError::from(err).to_exit_code(), code);
        }
    }

    #[test]
    fn test_config_errors_are_cli_errors() {
        let err = ToolrunError::from(ConfigError::InvalidFile("bad".into()));
        assert_eq!(err.to_exit_code(), ExitCode::CLI_ARGS);
        assert!(!err.suggestions().is_empty());

        let err = ToolrunError::config_load(&anyhow::anyhow!("boom").context("Failed to load"));
        assert_eq!(err.to_string(), "Failed to load: boom");
    }

    #[test]
    fn test_collect_failure_keeps_run_exit_code() {
        let outcome = RunOutcome {
            success: false,
            error: Some(RunError::Timeout {
                program: "delta".into(),
                timeout: Duration::from_secs(5),
                log: String::new(),
            }),
            elapsed: Duration::from_secs(5),
            state: toolrun_runner::RunState::Failed,
            exit_code: None,
            units_done: 0,
            log_file: None,
            started_at: chrono::Utc::now(),
        };
        let err = ToolrunError::Collect {
            workdir: PathBuf::from("/tmp/toolrun-delta-imgs_x"),
            outcome: Box::new(outcome),
            source: Box::new(ToolrunError::io(
                "Could not copy results",
                std::io::Error::other("disk full"),
            )),
        };

        assert_eq!(err.to_exit_code(), ExitCode::TIMEOUT);
        assert!(err.to_string().contains("/tmp/toolrun-delta-imgs_x"));
        assert!(err.user_message().contains("did not finish within 5 seconds"));
        assert!(err.suggestions()[0].contains("/tmp/toolrun-delta-imgs_x"));
    }

    #[test]
    fn test_run_failure_message_includes_log() {
        let err = ToolrunError::from(RunError::Execution {
            program: "delta".into(),
            reason: "exited with exit status: 2".into(),
            exit_code: Some(2),
            log: "Traceback: boom".into(),
        });
        let message = err.user_message();
        assert!(message.starts_with("delta failed: exited with exit status: 2"));
        assert!(message.contains("Traceback: boom"));
    }
}
