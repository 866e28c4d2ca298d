//! Invocation builder: base command plus ordered arguments

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use crate::argument::{Argument, ArgumentSpec, Tokenization, typed_translator};
use crate::error::{ArgumentError, ValidationError};
use crate::value::{ArgKind, ArgType, ArgValue};

static NEXT_INVOCATION_ID: AtomicU64 = AtomicU64::new(1);

/// Typed reference to an argument declared on a specific [`Invocation`].
///
/// Handles are cheap to copy. Using a handle with an invocation other than
/// the one that issued it yields [`ArgumentError::ForeignHandle`].
pub struct ArgHandle<T> {
    invocation: u64,
    index: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ArgHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ArgHandle<T> {}

impl<T> std::fmt::Debug for ArgHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArgHandle")
            .field("invocation", &self.invocation)
            .field("index", &self.index)
            .finish()
    }
}

impl<T> ArgHandle<T> {
    /// Position of the argument in declaration order.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }
}

/// A base command and the arguments that follow it.
#[derive(Debug, Clone)]
pub struct Invocation {
    id: u64,
    launcher: Vec<String>,
    command: Vec<String>,
    arguments: Vec<Argument>,
}

impl Invocation {
    /// Create an invocation whose base command is `command` split on whitespace.
    ///
    /// `"delta run"` yields the base tokens `["delta", "run"]`.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self::from_tokens(command.split_whitespace().map(str::to_string))
    }

    /// Create an invocation from pre-split base tokens.
    #[must_use]
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: NEXT_INVOCATION_ID.fetch_add(1, Ordering::Relaxed),
            launcher: Vec::new(),
            command: tokens.into_iter().map(Into::into).collect(),
            arguments: Vec::new(),
        }
    }

    /// Prefix the base command with launcher tokens such as `conda run -n env`.
    #[must_use]
    pub fn with_launcher<I, S>(mut self, launcher: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.launcher = launcher.into_iter().map(Into::into).collect();
        self
    }

    /// Launcher followed by the base command.
    #[must_use]
    pub fn base_tokens(&self) -> Vec<String> {
        self.launcher
            .iter()
            .chain(self.command.iter())
            .cloned()
            .collect()
    }

    /// Executable that will actually be spawned.
    #[must_use]
    pub fn program(&self) -> Option<&str> {
        self.launcher
            .first()
            .or_else(|| self.command.first())
            .map(String::as_str)
    }

    /// The base command without the launcher.
    #[must_use]
    pub fn command(&self) -> &[String] {
        &self.command
    }

    #[must_use]
    pub fn launcher(&self) -> &[String] {
        &self.launcher
    }

    /// All arguments in declaration order.
    #[must_use]
    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    /// Arguments meant to be shown to users, in declaration order.
    pub fn visible_arguments(&self) -> impl Iterator<Item = &Argument> {
        self.arguments.iter().filter(|a| a.is_visible())
    }

    /// Look up the argument behind `handle`.
    pub fn argument<T>(&self, handle: ArgHandle<T>) -> Result<&Argument, ArgumentError> {
        self.check_handle(&handle)?;
        self.arguments
            .get(handle.index)
            .ok_or(ArgumentError::ForeignHandle)
    }

    /// Declare an argument and return its handle.
    ///
    /// Declaration order is the order tokens appear in [`build`](Self::build).
    pub fn add<T: ArgType>(&mut self, spec: ArgumentSpec<T>) -> ArgHandle<T> {
        let mut argument = spec.into_argument();

        let stray_default = match (argument.kind(), argument.default_value()) {
            (ArgKind::Choice(choices), Some(ArgValue::Str(default))) => {
                !choices.contains(default)
            }
            _ => false,
        };
        if stray_default {
            warn!(
                argument = argument.name(),
                "Dropping default outside the allowed choices"
            );
            argument = argument.without_default();
        }

        let index = self.arguments.len();
        debug!(
            argument = argument.name(),
            token = argument.cli_token(),
            kind = argument.kind().as_str(),
            "Declared argument"
        );
        self.arguments.push(argument);

        ArgHandle {
            invocation: self.id,
            index,
            _marker: PhantomData,
        }
    }

    /// Set the value of the argument behind `handle`.
    pub fn set<T: ArgType>(
        &mut self,
        handle: ArgHandle<T>,
        value: impl Into<T>,
    ) -> Result<(), ArgumentError> {
        let argument = self.argument_mut(&handle)?;
        let value = value.into().into_value();
        debug!(argument = argument.name(), value = %value, "Setting argument");
        argument.set_value(value)
    }

    /// Effective value: the set value, else the default, else `None`.
    #[must_use]
    pub fn get<T: ArgType>(&self, handle: ArgHandle<T>) -> Option<T> {
        self.argument(handle)
            .ok()
            .and_then(Argument::value)
            .and_then(T::from_value)
    }

    /// Forget the explicitly set value so the default applies again.
    pub fn clear<T>(&mut self, handle: ArgHandle<T>) -> Result<(), ArgumentError> {
        self.argument_mut(&handle)?.clear();
        Ok(())
    }

    /// Replace the tokenization of an already declared argument.
    pub fn set_translator<T, F>(
        &mut self,
        handle: ArgHandle<T>,
        translate: F,
    ) -> Result<(), ArgumentError>
    where
        T: ArgType,
        F: Fn(&T) -> Vec<String> + Send + Sync + 'static,
    {
        self.argument_mut(&handle)?
            .set_tokenization(typed_translator(translate));
        Ok(())
    }

    /// First validation failure in declaration order, `None` when buildable.
    #[must_use]
    pub fn check(&self) -> Option<String> {
        self.arguments.iter().find_map(Argument::validate)
    }

    /// Produce the full token list: base tokens then each argument's tokens.
    pub fn build(&self) -> Result<Vec<String>, ValidationError> {
        for argument in &self.arguments {
            if let Some(message) = argument.validate() {
                return Err(ValidationError::new(argument.name(), message));
            }
        }

        let mut tokens = self.base_tokens();
        for argument in &self.arguments {
            tokens.extend(argument.to_tokens());
        }
        Ok(tokens)
    }

    /// Restore argument values from a previously built token list.
    ///
    /// The list must start with the base tokens. All set values are cleared
    /// first. Arguments with default tokenization are matched by their token;
    /// positional arguments take the remaining bare tokens in declaration
    /// order. Flags whose token is absent are set to `false`. Arguments with
    /// a custom translator cannot be recovered and keep their default.
    pub fn parse<S: AsRef<str>>(&mut self, tokens: &[S]) -> Result<(), ArgumentError> {
        let base = self.base_tokens();
        let head: Vec<&str> = tokens.iter().take(base.len()).map(AsRef::as_ref).collect();
        if head.len() < base.len() || head.iter().zip(&base).any(|(a, b)| *a != b.as_str()) {
            return Err(ArgumentError::CommandMismatch {
                expected: base.join(" "),
                found: head.join(" "),
            });
        }

        for argument in &mut self.arguments {
            argument.clear();
        }

        let positional: Vec<usize> = self
            .arguments
            .iter()
            .enumerate()
            .filter(|(_, a)| a.cli_token().is_empty() && !a.tokenization().is_custom())
            .map(|(i, _)| i)
            .collect();
        let mut next_positional = positional.into_iter();
        let mut seen_flags = vec![false; self.arguments.len()];

        let mut rest = tokens[base.len()..].iter().map(AsRef::as_ref);
        while let Some(token) = rest.next() {
            let named = self.arguments.iter().position(|a| {
                !a.cli_token().is_empty()
                    && a.cli_token() == token
                    && matches!(a.tokenization(), Tokenization::Default)
            });

            let (index, raw) = match named {
                Some(index) if *self.arguments[index].kind() == ArgKind::Flag => {
                    seen_flags[index] = true;
                    self.arguments[index].set_value(ArgValue::Flag(true))?;
                    continue;
                }
                Some(index) => {
                    let raw = rest.next().ok_or_else(|| ArgumentError::MissingValue {
                        token: token.to_string(),
                    })?;
                    (index, raw)
                }
                None => match next_positional.next() {
                    Some(index) => (index, token),
                    None => {
                        return Err(ArgumentError::UnknownToken {
                            token: token.to_string(),
                        });
                    }
                },
            };

            let argument = &mut self.arguments[index];
            let value = argument
                .kind()
                .parse(raw)
                .map_err(|reason| ArgumentError::InvalidValue {
                    name: argument.name().to_string(),
                    value: raw.to_string(),
                    reason,
                })?;
            argument.set_value(value)?;
        }

        for (argument, seen) in self.arguments.iter_mut().zip(seen_flags) {
            let unseen_flag = *argument.kind() == ArgKind::Flag
                && !seen
                && !argument.cli_token().is_empty()
                && matches!(argument.tokenization(), Tokenization::Default);
            if unseen_flag {
                argument.set_value(ArgValue::Flag(false))?;
            }
        }

        Ok(())
    }

    pub(crate) fn arguments_mut(&mut self) -> &mut [Argument] {
        &mut self.arguments
    }

    fn argument_mut<T>(&mut self, handle: &ArgHandle<T>) -> Result<&mut Argument, ArgumentError> {
        self.check_handle(handle)?;
        self.arguments
            .get_mut(handle.index)
            .ok_or(ArgumentError::ForeignHandle)
    }

    fn check_handle<T>(&self, handle: &ArgHandle<T>) -> Result<(), ArgumentError> {
        if handle.invocation == self.id {
            Ok(())
        } else {
            Err(ArgumentError::ForeignHandle)
        }
    }
}
