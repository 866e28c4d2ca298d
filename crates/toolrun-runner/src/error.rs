//! Error types for tool runs

use std::time::Duration;
use thiserror::Error;

/// Message shown when the OS refuses to execute the program.
pub const PERMISSION_DENIED_MESSAGE: &str =
    "The executable does not have the file permission to run.";

/// Broad class of a run failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunErrorKind {
    /// The invocation could not be built. No process was started.
    Validation,
    /// The process never started.
    Launch,
    /// The process started but the run did not complete normally.
    Execution,
}

/// Terminal failure of a run.
///
/// Every variant except `Validation` carries the log file contents captured
/// when the run ended (possibly empty).
#[derive(Error, Debug, Clone)]
pub enum RunError {
    #[error("{message}")]
    Validation { message: String },

    #[error("Problem running {program}:\n{reason}")]
    Launch {
        program: String,
        reason: String,
        log: String,
    },

    #[error("Problem running {program}:\n{}", PERMISSION_DENIED_MESSAGE)]
    PermissionDenied { program: String, log: String },

    #[error("{program} failed: {reason}")]
    Execution {
        program: String,
        reason: String,
        exit_code: Option<i32>,
        log: String,
    },

    #[error("{program} did not finish within {} seconds", .timeout.as_secs())]
    Timeout {
        program: String,
        timeout: Duration,
        log: String,
    },

    #[error("{program} was cancelled")]
    Cancelled { program: String, log: String },
}

impl RunError {
    #[must_use]
    pub const fn kind(&self) -> RunErrorKind {
        match self {
            Self::Validation { .. } => RunErrorKind::Validation,
            Self::Launch { .. } | Self::PermissionDenied { .. } => RunErrorKind::Launch,
            Self::Execution { .. } | Self::Timeout { .. } | Self::Cancelled { .. } => {
                RunErrorKind::Execution
            }
        }
    }

    /// Log contents captured when the run ended.
    #[must_use]
    pub fn log(&self) -> &str {
        match self {
            Self::Validation { .. } => "",
            Self::Launch { log, .. }
            | Self::PermissionDenied { log, .. }
            | Self::Execution { log, .. }
            | Self::Timeout { log, .. }
            | Self::Cancelled { log, .. } => log,
        }
    }

    /// The error message followed by the captured log, if any.
    #[must_use]
    pub fn full_message(&self) -> String {
        let log = self.log().trim_end();
        if log.is_empty() {
            self.to_string()
        } else {
            format!("{self}\n{log}")
        }
    }

    pub(crate) fn launch(program: &str, err: &std::io::Error, log: String) -> Self {
        if err.kind() == std::io::ErrorKind::PermissionDenied {
            Self::PermissionDenied {
                program: program.to_string(),
                log,
            }
        } else {
            Self::Launch {
                program: program.to_string(),
                reason: err.to_string(),
                log,
            }
        }
    }
}
