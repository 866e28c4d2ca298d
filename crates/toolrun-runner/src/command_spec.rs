use std::ffi::OsString;
use std::path::PathBuf;
use tokio::process::Command as TokioCommand;

/// Specification for a process launch.
///
/// Arguments are kept as `Vec<OsString>` and handed to the OS as discrete
/// argv elements. There is no shell string evaluation anywhere on this path,
/// so a token such as `a; rm -rf /` reaches the child verbatim.
///
/// # Example
///
/// ```rust
/// use toolrun_runner::CommandSpec;
/// use std::ffi::OsString;
///
/// let tokens = ["delta", "run", "--input", "/data/img-t{t}.tif"];
/// let cmd = CommandSpec::from_tokens(tokens).unwrap().cwd("/data");
///
/// assert_eq!(cmd.program, OsString::from("delta"));
/// assert_eq!(cmd.args.len(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CommandSpec {
    /// The program to execute
    pub program: OsString,
    /// Arguments as discrete elements
    pub args: Vec<OsString>,
    /// Optional working directory
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Split a built token list into program and arguments.
    ///
    /// Returns `None` for an empty list.
    pub fn from_tokens<I, S>(tokens: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let mut iter = tokens.into_iter();
        let program = iter.next()?;
        Some(Self::new(program).args(iter))
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Program name for messages: the file name of the program path.
    #[must_use]
    pub fn display_name(&self) -> String {
        std::path::Path::new(&self.program)
            .file_name()
            .unwrap_or(self.program.as_os_str())
            .to_string_lossy()
            .into_owned()
    }

    /// Convert into a `tokio::process::Command` for async execution.
    #[must_use]
    pub fn to_tokio_command(&self) -> TokioCommand {
        let mut cmd = TokioCommand::new(&self.program);
        cmd.args(&self.args);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }
}
