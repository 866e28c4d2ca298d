use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::ArgumentError;
use crate::value::{ArgKind, ArgType, ArgValue};

/// Function turning an argument value into the tokens it contributes.
pub type Translator = Arc<dyn Fn(&ArgValue) -> Vec<String> + Send + Sync>;

/// How an argument turns its value into command-line tokens.
#[derive(Clone, Default)]
pub enum Tokenization {
    /// `[token, value]` for valued arguments, `[token]` for set flags.
    #[default]
    Default,
    /// The translator receives the effective value and returns the tokens as-is.
    Custom(Translator),
}

impl Tokenization {
    #[must_use]
    pub const fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

impl fmt::Debug for Tokenization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("Default"),
            Self::Custom(_) => f.write_str("Custom(<fn>)"),
        }
    }
}

/// One configurable command-line parameter.
///
/// Arguments are owned by the [`Invocation`](crate::Invocation) that declared
/// them. Read access is available through [`Invocation::argument`](crate::Invocation::argument)
/// and [`Invocation::arguments`](crate::Invocation::arguments); values are
/// changed through typed handles.
#[derive(Debug, Clone)]
pub struct Argument {
    name: String,
    cli_token: String,
    key: Option<String>,
    help: Option<String>,
    kind: ArgKind,
    value: Option<ArgValue>,
    default: Option<ArgValue>,
    required: bool,
    visible: bool,
    tokenization: Tokenization,
}

impl Argument {
    /// Display label.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// CLI token such as `-C` or `--input`. Empty for positional arguments.
    #[must_use]
    pub fn cli_token(&self) -> &str {
        &self.cli_token
    }

    /// Persistence key. `None` means the argument is never persisted.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    #[must_use]
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    #[must_use]
    pub const fn kind(&self) -> &ArgKind {
        &self.kind
    }

    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    #[must_use]
    pub const fn tokenization(&self) -> &Tokenization {
        &self.tokenization
    }

    /// Whether a value was explicitly set.
    #[must_use]
    pub const fn is_set(&self) -> bool {
        self.value.is_some()
    }

    #[must_use]
    pub const fn default_value(&self) -> Option<&ArgValue> {
        self.default.as_ref()
    }

    /// Current value, falling back to the default when unset.
    #[must_use]
    pub fn value(&self) -> Option<&ArgValue> {
        self.value.as_ref().or(self.default.as_ref())
    }

    /// Error description when the argument cannot be serialized, `None` otherwise.
    ///
    /// Only a required argument with neither a default nor a set value is invalid.
    #[must_use]
    pub fn validate(&self) -> Option<String> {
        if self.required && self.value().is_none() {
            let message = if self.cli_token.is_empty() {
                format!("Required argument '{}' has no value", self.name)
            } else {
                format!(
                    "Required argument '{}' ({}) has no value",
                    self.name, self.cli_token
                )
            };
            return Some(message);
        }
        None
    }

    /// Tokens this argument contributes to the command line.
    #[must_use]
    pub fn to_tokens(&self) -> Vec<String> {
        let Some(value) = self.value() else {
            return Vec::new();
        };

        match &self.tokenization {
            Tokenization::Custom(translate) => translate(value),
            Tokenization::Default => match value {
                ArgValue::Flag(true) if !self.cli_token.is_empty() => vec![self.cli_token.clone()],
                ArgValue::Flag(_) => Vec::new(),
                other if self.cli_token.is_empty() => vec![other.to_string()],
                other => vec![self.cli_token.clone(), other.to_string()],
            },
        }
    }

    pub(crate) fn set_value(&mut self, value: ArgValue) -> Result<(), ArgumentError> {
        self.check_value(&value)?;
        self.value = Some(value);
        Ok(())
    }

    pub(crate) fn clear(&mut self) {
        self.value = None;
    }

    pub(crate) fn set_tokenization(&mut self, tokenization: Tokenization) {
        self.tokenization = tokenization;
    }

    pub(crate) fn without_default(mut self) -> Self {
        self.default = None;
        self
    }

    pub(crate) fn check_value(&self, value: &ArgValue) -> Result<(), ArgumentError> {
        if !self.kind.matches(value) {
            return Err(ArgumentError::TypeMismatch {
                name: self.name.clone(),
                expected: self.kind.as_str(),
                found: value.type_name().to_string(),
            });
        }
        if let (ArgKind::Choice(choices), ArgValue::Str(s)) = (&self.kind, value) {
            if !choices.iter().any(|c| c == s) {
                return Err(ArgumentError::InvalidChoice {
                    name: self.name.clone(),
                    value: s.clone(),
                    choices: choices.join(", "),
                });
            }
        }
        Ok(())
    }
}

/// Declaration of an argument of type `T`, consumed by
/// [`Invocation::add`](crate::Invocation::add).
///
/// # Example
///
/// ```rust
/// use toolrun_args::ArgumentSpec;
///
/// let spec = ArgumentSpec::flag("Display progress bars")
///     .token("--progress")
///     .default_value(true)
///     .visible(false);
/// ```
#[derive(Debug, Clone)]
pub struct ArgumentSpec<T: ArgType> {
    argument: Argument,
    _marker: PhantomData<fn() -> T>,
}

impl<T: ArgType> ArgumentSpec<T> {
    /// Optional, visible, unpersisted argument with no token and no default.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_kind(name, T::kind())
    }

    fn with_kind(name: impl Into<String>, kind: ArgKind) -> Self {
        Self {
            argument: Argument {
                name: name.into(),
                cli_token: String::new(),
                key: None,
                help: None,
                kind,
                value: None,
                default: None,
                required: false,
                visible: true,
                tokenization: Tokenization::Default,
            },
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.argument.cli_token = token.into();
        self
    }

    #[must_use]
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.argument.help = Some(help.into());
        self
    }

    /// Stable persistence key.
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.argument.key = Some(key.into());
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<T>) -> Self {
        self.argument.default = Some(value.into().into_value());
        self
    }

    #[must_use]
    pub const fn required(mut self, required: bool) -> Self {
        self.argument.required = required;
        self
    }

    #[must_use]
    pub const fn visible(mut self, visible: bool) -> Self {
        self.argument.visible = visible;
        self
    }

    /// Replace the default tokenization with `translate`.
    #[must_use]
    pub fn translator<F>(mut self, translate: F) -> Self
    where
        F: Fn(&T) -> Vec<String> + Send + Sync + 'static,
    {
        self.argument.tokenization = typed_translator(translate);
        self
    }

    pub(crate) fn into_argument(self) -> Argument {
        self.argument
    }
}

impl ArgumentSpec<bool> {
    #[must_use]
    pub fn flag(name: impl Into<String>) -> Self {
        Self::new(name)
    }
}

impl ArgumentSpec<i64> {
    #[must_use]
    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name)
    }
}

impl ArgumentSpec<f64> {
    #[must_use]
    pub fn double(name: impl Into<String>) -> Self {
        Self::new(name)
    }
}

impl ArgumentSpec<String> {
    #[must_use]
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name)
    }

    /// String argument restricted to `choices`.
    #[must_use]
    pub fn choice<I, S>(name: impl Into<String>, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let choices = choices.into_iter().map(Into::into).collect();
        Self::with_kind(name, ArgKind::Choice(choices))
    }
}

pub(crate) fn typed_translator<T, F>(translate: F) -> Tokenization
where
    T: ArgType,
    F: Fn(&T) -> Vec<String> + Send + Sync + 'static,
{
    Tokenization::Custom(Arc::new(move |value: &ArgValue| {
        T::from_value(value)
            .map(|typed| translate(&typed))
            .unwrap_or_default()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(spec: ArgumentSpec<impl ArgType>) -> Argument {
        spec.into_argument()
    }

    #[test]
    fn test_required_without_default_is_invalid_until_set() {
        let mut arg = build(ArgumentSpec::string("Input file").token("--input").required(true));
        assert_eq!(
            arg.validate().as_deref(),
            Some("Required argument 'Input file' (--input) has no value")
        );

        arg.set_value(ArgValue::Str("in.tif".to_string())).unwrap();
        assert!(arg.validate().is_none());
    }

    #[test]
    fn test_required_with_default_is_valid() {
        let arg = build(
            ArgumentSpec::flag("Display progress bars")
                .token("--progress")
                .required(true)
                .default_value(true),
        );
        assert!(arg.validate().is_none());
        assert_eq!(arg.to_tokens(), vec!["--progress"]);
    }

    #[test]
    fn test_optional_without_value_contributes_nothing() {
        let arg = build(ArgumentSpec::int("Seed").token("--seed"));
        assert!(arg.validate().is_none());
        assert!(arg.to_tokens().is_empty());
    }

    #[test]
    fn test_default_tokenization() {
        let mut arg = build(ArgumentSpec::int("Min cell area").token("-C").default_value(0));
        assert_eq!(arg.to_tokens(), vec!["-C", "0"]);

        arg.set_value(ArgValue::Int(20)).unwrap();
        assert_eq!(arg.to_tokens(), vec!["-C", "20"]);
    }

    #[test]
    fn test_flag_false_contributes_nothing() {
        let mut arg = build(ArgumentSpec::flag("Verbose").token("-v"));
        arg.set_value(ArgValue::Flag(false)).unwrap();
        assert!(arg.to_tokens().is_empty());
    }

    #[test]
    fn test_positional_argument() {
        let arg = build(ArgumentSpec::string("Target").default_value("movie.tif"));
        assert_eq!(arg.to_tokens(), vec!["movie.tif"]);
    }

    #[test]
    fn test_translator_replaces_default_tokens() {
        let mut arg = build(
            ArgumentSpec::int("Min cell area")
                .token("-C")
                .translator(|v: &i64| vec![format!("min_cell_area={v}")]),
        );
        arg.set_value(ArgValue::Int(20)).unwrap();
        assert_eq!(arg.to_tokens(), vec!["min_cell_area=20"]);
        assert!(arg.tokenization().is_custom());
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let mut arg = build(ArgumentSpec::int("Min cell area"));
        let err = arg.set_value(ArgValue::Str("x".to_string())).unwrap_err();
        assert!(matches!(err, ArgumentError::TypeMismatch { expected: "integer", .. }));
        assert!(!arg.is_set());
    }

    #[test]
    fn test_choice_membership_checked() {
        let mut arg = build(ArgumentSpec::choice("Model", ["2D", "mothermachine"]).token("-c"));
        assert!(arg.set_value(ArgValue::Str("2D".to_string())).is_ok());

        let err = arg.set_value(ArgValue::Str("3D".to_string())).unwrap_err();
        assert!(matches!(err, ArgumentError::InvalidChoice { .. }));
        assert_eq!(arg.value(), Some(&ArgValue::Str("2D".to_string())));
    }

    #[test]
    fn test_value_falls_back_to_default() {
        let mut arg = build(ArgumentSpec::string("Config").default_value("2D"));
        assert_eq!(arg.value(), Some(&ArgValue::Str("2D".to_string())));
        assert!(!arg.is_set());

        arg.set_value(ArgValue::Str("mothermachine".to_string())).unwrap();
        arg.clear();
        assert_eq!(arg.value(), Some(&ArgValue::Str("2D".to_string())));
    }
}
