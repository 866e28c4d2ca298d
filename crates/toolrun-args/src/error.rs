//! Error types for argument declarations and invocations

use thiserror::Error;

/// Errors raised while setting, restoring or parsing argument values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArgumentError {
    #[error("Argument '{name}' expects a {expected} value, got {found}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: String,
    },

    #[error("Argument '{name}' does not accept '{value}' (expected one of: {choices})")]
    InvalidChoice {
        name: String,
        value: String,
        choices: String,
    },

    #[error("Invalid value '{value}' for argument '{name}': {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Argument handle does not belong to this invocation")]
    ForeignHandle,

    #[error("Setting '{key}' expects a {expected} value, got {found}")]
    InvalidSetting {
        key: String,
        expected: &'static str,
        found: String,
    },

    #[error("Expected command '{expected}', found '{found}'")]
    CommandMismatch { expected: String, found: String },

    #[error("Unrecognized token '{token}'")]
    UnknownToken { token: String },

    #[error("Missing value after '{token}'")]
    MissingValue { token: String },
}

/// An invocation cannot be built because a required argument has no value.
///
/// `message` is the same text [`Invocation::check`](crate::Invocation::check)
/// returns; `argument` names the first unsatisfied argument in declaration order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    pub argument: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(argument: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            argument: argument.into(),
        }
    }
}
