//! Argument values and kinds

use serde::Serialize;
use std::fmt;

/// The current or default value of an argument.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ArgValue {
    Flag(bool),
    Int(i64),
    Double(f64),
    Str(String),
}

impl ArgValue {
    /// Short type name used in error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Flag(_) => "flag",
            Self::Int(_) => "integer",
            Self::Double(_) => "double",
            Self::Str(_) => "string",
        }
    }

    /// Convert to a JSON value for persistence.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Flag(b) => serde_json::Value::Bool(*b),
            Self::Int(n) => serde_json::Value::from(*n),
            Self::Double(x) => serde_json::Value::from(*x),
            Self::Str(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Double(x) => write!(f, "{x}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

/// What an argument accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgKind {
    Flag,
    Int,
    Double,
    Str,
    /// A string restricted to a fixed set of values.
    Choice(Vec<String>),
}

impl ArgKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Int => "integer",
            Self::Double => "double",
            Self::Str => "string",
            Self::Choice(_) => "choice",
        }
    }

    /// Parse a raw command-line token into a value of this kind.
    pub fn parse(&self, raw: &str) -> Result<ArgValue, String> {
        match self {
            Self::Flag => match raw {
                "true" | "1" | "yes" => Ok(ArgValue::Flag(true)),
                "false" | "0" | "no" => Ok(ArgValue::Flag(false)),
                _ => Err("not a boolean".to_string()),
            },
            Self::Int => raw
                .parse::<i64>()
                .map(ArgValue::Int)
                .map_err(|e| e.to_string()),
            Self::Double => raw
                .parse::<f64>()
                .map(ArgValue::Double)
                .map_err(|e| e.to_string()),
            Self::Str => Ok(ArgValue::Str(raw.to_string())),
            Self::Choice(choices) => {
                if choices.iter().any(|c| c == raw) {
                    Ok(ArgValue::Str(raw.to_string()))
                } else {
                    Err(format!("expected one of: {}", choices.join(", ")))
                }
            }
        }
    }

    /// Convert a persisted JSON value into a value of this kind.
    #[must_use]
    pub fn from_json(&self, json: &serde_json::Value) -> Option<ArgValue> {
        match self {
            Self::Flag => json.as_bool().map(ArgValue::Flag),
            Self::Int => json.as_i64().map(ArgValue::Int),
            Self::Double => json.as_f64().map(ArgValue::Double),
            Self::Str | Self::Choice(_) => json.as_str().map(|s| ArgValue::Str(s.to_string())),
        }
    }

    /// Whether `value` has the right shape for this kind (choice membership excluded).
    #[must_use]
    pub fn matches(&self, value: &ArgValue) -> bool {
        matches!(
            (self, value),
            (Self::Flag, ArgValue::Flag(_))
                | (Self::Int, ArgValue::Int(_))
                | (Self::Double, ArgValue::Double(_))
                | (Self::Str | Self::Choice(_), ArgValue::Str(_))
        )
    }
}

/// Rust types that can back an argument.
///
/// Implemented for `bool` (flags), `i64`, `f64` and `String` (plain strings
/// and choices). Handles are parameterized by this type, so `set` and `get`
/// are checked at compile time.
pub trait ArgType: Sized + Clone {
    /// The kind a plain declaration of this type gets.
    fn kind() -> ArgKind;

    fn into_value(self) -> ArgValue;

    fn from_value(value: &ArgValue) -> Option<Self>;
}

impl ArgType for bool {
    fn kind() -> ArgKind {
        ArgKind::Flag
    }

    fn into_value(self) -> ArgValue {
        ArgValue::Flag(self)
    }

    fn from_value(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Flag(b) => Some(*b),
            _ => None,
        }
    }
}

impl ArgType for i64 {
    fn kind() -> ArgKind {
        ArgKind::Int
    }

    fn into_value(self) -> ArgValue {
        ArgValue::Int(self)
    }

    fn from_value(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl ArgType for f64 {
    fn kind() -> ArgKind {
        ArgKind::Double
    }

    fn into_value(self) -> ArgValue {
        ArgValue::Double(self)
    }

    fn from_value(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Double(x) => Some(*x),
            ArgValue::Int(n) => Some(*n as f64),
            _ => None,
        }
    }
}

impl ArgType for String {
    fn kind() -> ArgKind {
        ArgKind::Str
    }

    fn into_value(self) -> ArgValue {
        ArgValue::Str(self)
    }

    fn from_value(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
}
