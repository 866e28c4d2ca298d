//! Run state machine: validate, launch, tail, wait, report

use std::fs::OpenOptions;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::process::Child;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span};

use toolrun_args::Invocation;

use crate::command_spec::CommandSpec;
use crate::error::RunError;
use crate::platform;
use crate::progress::{ImageProgressPolicy, LinePolicy};
use crate::sink::{DisplayHint, ProgressSink};
use crate::tailer::{DEFAULT_POLL_INTERVAL, LogTailer, TailSummary};

/// Lifecycle of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Preparing,
    Running,
    Succeeded,
    Failed,
}

impl RunState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Tuning knobs for [`ToolRunner`].
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub poll_interval: Duration,
    /// Kill the tool when it runs longer than this.
    pub timeout: Option<Duration>,
    /// Time between SIGTERM and SIGKILL when terminating.
    pub kill_grace: Duration,
    /// Treat a nonzero or signal exit as a failure.
    pub check_exit_code: bool,
    /// Name shown in the status line instead of the program name.
    pub label: Option<String>,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
            kill_grace: Duration::from_secs(5),
            check_exit_code: true,
            label: None,
        }
    }
}

/// One concrete execution, built right before launch.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub tokens: Vec<String>,
    pub working_dir: PathBuf,
    pub log_file: PathBuf,
    pub total_units: u64,
}

impl RunRequest {
    /// Build the invocation into a request.
    pub fn from_invocation(
        invocation: &Invocation,
        working_dir: impl Into<PathBuf>,
        log_file: impl Into<PathBuf>,
        total_units: u64,
    ) -> Result<Self, RunError> {
        let tokens = invocation.build().map_err(|e| RunError::Validation {
            message: e.message,
        })?;
        Ok(Self {
            tokens,
            working_dir: working_dir.into(),
            log_file: log_file.into(),
            total_units,
        })
    }
}

/// Result of a run. Immutable once returned.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub success: bool,
    pub error: Option<RunError>,
    pub elapsed: Duration,
    pub state: RunState,
    /// Exit code, when the child exited normally.
    pub exit_code: Option<i32>,
    pub units_done: u64,
    pub log_file: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
}

impl RunOutcome {
    /// Error message with the captured log appended, `None` on success.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(RunError::full_message)
    }
}

enum Waited {
    Exited(std::io::Result<std::process::ExitStatus>),
    Cancelled,
    TimedOut(Duration),
}

/// Runs external tools and reports their progress.
///
/// A runner handles one run at a time; every `run*` method takes `&mut self`.
/// Each run starts from [`RunState::Idle`] and ends in a terminal state.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use toolrun_args::{ArgumentSpec, Invocation};
/// use toolrun_runner::{NoopSink, RunnerOptions, ToolRunner};
///
/// let mut inv = Invocation::new("delta run");
/// let input = inv.add(ArgumentSpec::string("Input file").token("--input").required(true));
/// inv.set(input, "/data/img-t{t}.tif").unwrap();
///
/// let mut runner = ToolRunner::new(RunnerOptions::default());
/// let outcome = runner.run(&inv, "/data", "/data/delta2.log", 40, Arc::new(NoopSink));
/// if !outcome.success {
///     eprintln!("{}", outcome.error_message().unwrap_or_default());
/// }
/// ```
pub struct ToolRunner {
    options: RunnerOptions,
    policy: Arc<dyn LinePolicy>,
    state: RunState,
}

impl std::fmt::Debug for ToolRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRunner")
            .field("options", &self.options)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Default for ToolRunner {
    fn default() -> Self {
        Self::new(RunnerOptions::default())
    }
}

impl ToolRunner {
    /// Runner counting `image <n>/<m>` lines as progress.
    #[must_use]
    pub fn new(options: RunnerOptions) -> Self {
        Self {
            options,
            policy: Arc::new(ImageProgressPolicy),
            state: RunState::Idle,
        }
    }

    /// Replace the line classification policy.
    #[must_use]
    pub fn with_policy(mut self, policy: Arc<dyn LinePolicy>) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub const fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// State of the current or most recent run.
    #[must_use]
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// Run to completion, blocking the calling thread.
    ///
    /// Drives the run on a private current-thread runtime, so this must not
    /// be called from inside an async context; use [`run_async`](Self::run_async) there.
    pub fn run(
        &mut self,
        invocation: &Invocation,
        working_dir: impl AsRef<Path>,
        log_file: impl AsRef<Path>,
        total_units: u64,
        sink: Arc<dyn ProgressSink>,
    ) -> RunOutcome {
        let started_at = Utc::now();
        let start = Instant::now();

        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                error!(error = %e, "Failed to create async runtime");
                self.state = RunState::Failed;
                return RunOutcome {
                    success: false,
                    error: Some(RunError::Execution {
                        program: program_name(invocation),
                        reason: format!("could not start async runtime: {e}"),
                        exit_code: None,
                        log: String::new(),
                    }),
                    elapsed: start.elapsed(),
                    state: RunState::Failed,
                    exit_code: None,
                    units_done: 0,
                    log_file: None,
                    started_at,
                };
            }
        };

        runtime.block_on(self.run_async(invocation, working_dir, log_file, total_units, sink))
    }

    /// Async variant of [`run`](Self::run).
    pub async fn run_async(
        &mut self,
        invocation: &Invocation,
        working_dir: impl AsRef<Path>,
        log_file: impl AsRef<Path>,
        total_units: u64,
        sink: Arc<dyn ProgressSink>,
    ) -> RunOutcome {
        self.run_with_cancel(
            invocation,
            working_dir,
            log_file,
            total_units,
            sink,
            CancellationToken::new(),
        )
        .await
    }

    /// Run until the tool exits, the timeout expires or `cancel` fires.
    pub async fn run_with_cancel(
        &mut self,
        invocation: &Invocation,
        working_dir: impl AsRef<Path>,
        log_file: impl AsRef<Path>,
        total_units: u64,
        sink: Arc<dyn ProgressSink>,
        cancel: CancellationToken,
    ) -> RunOutcome {
        let started_at = Utc::now();
        let start = Instant::now();
        self.state = RunState::Preparing;

        match RunRequest::from_invocation(
            invocation,
            working_dir.as_ref(),
            log_file.as_ref(),
            total_units,
        ) {
            Ok(request) => self.execute(request, sink, cancel, started_at, start).await,
            Err(err) => {
                debug!("Invocation is not valid");
                self.finish(
                    Err(err),
                    None,
                    TailSummary::default(),
                    None,
                    started_at,
                    start,
                )
            }
        }
    }

    /// Execute an already built request.
    pub async fn run_request(
        &mut self,
        request: RunRequest,
        sink: Arc<dyn ProgressSink>,
        cancel: CancellationToken,
    ) -> RunOutcome {
        let started_at = Utc::now();
        let start = Instant::now();
        self.state = RunState::Preparing;
        self.execute(request, sink, cancel, started_at, start).await
    }

    async fn execute(
        &mut self,
        request: RunRequest,
        sink: Arc<dyn ProgressSink>,
        cancel: CancellationToken,
        started_at: DateTime<Utc>,
        start: Instant,
    ) -> RunOutcome {
        let Some(spec) = CommandSpec::from_tokens(&request.tokens) else {
            let err = RunError::Validation {
                message: "Invocation has no command".to_string(),
            };
            return self.finish(
                Err(err),
                None,
                TailSummary::default(),
                None,
                started_at,
                start,
            );
        };
        let spec = spec.cwd(&request.working_dir);
        let program = spec.display_name();

        let span = info_span!("tool_run", program = %program, units = request.total_units);
        async move {
            let log_file = request.log_file.clone();
            let (result, exit_code, summary) = self
                .launch_and_wait(&spec, &program, &request, sink, cancel)
                .await;
            self.finish(result, exit_code, summary, Some(log_file), started_at, start)
        }
        .instrument(span)
        .await
    }

    async fn launch_and_wait(
        &mut self,
        spec: &CommandSpec,
        program: &str,
        request: &RunRequest,
        sink: Arc<dyn ProgressSink>,
        cancel: CancellationToken,
    ) -> (Result<(), RunError>, Option<i32>, TailSummary) {
        let (stdout, stderr) = match open_log(&request.log_file) {
            Ok(handles) => handles,
            Err(e) => {
                error!(path = %request.log_file.display(), error = %e, "Failed to open log file");
                let err = RunError::Launch {
                    program: program.to_string(),
                    reason: format!("cannot open log file {}: {e}", request.log_file.display()),
                    log: String::new(),
                };
                return (Err(err), None, TailSummary::default());
            }
        };

        self.state = RunState::Running;
        let label = self.options.label.as_deref().unwrap_or(program);
        sink.set_status(&format!("Running {label}"));
        sink.log("Command line:", DisplayHint::Plain);
        for token in &request.tokens {
            let hint = if token.contains(MAIN_SEPARATOR) {
                DisplayHint::Path
            } else {
                DisplayHint::Command
            };
            sink.log(token, hint);
        }

        let tailer = LogTailer::spawn(
            &request.log_file,
            self.options.poll_interval,
            request.total_units,
            Arc::clone(&self.policy),
            sink,
        );

        let mut cmd = spec.to_tokio_command();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true);
        platform::configure_process_group(&mut cmd);

        info!(args = ?spec.args, cwd = %request.working_dir.display(), "Launching tool");
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                let summary = tailer.stop().await;
                let log = read_log(&request.log_file).await;
                error!(error = %e, "Failed to launch tool");
                return (Err(RunError::launch(program, &e, log)), None, summary);
            }
        };
        debug!(pid = child.id(), "Tool started");

        let waited = self.wait(&mut child, &cancel).await;
        if matches!(waited, Waited::Cancelled | Waited::TimedOut(_)) {
            platform::terminate(&mut child, self.options.kill_grace).await;
        }
        let summary = tailer.stop().await;

        match waited {
            Waited::Exited(Ok(status)) => {
                let exit_code = status.code();
                if self.options.check_exit_code && !status.success() {
                    let err = RunError::Execution {
                        program: program.to_string(),
                        reason: format!("exited with {status}"),
                        exit_code,
                        log: read_log(&request.log_file).await,
                    };
                    (Err(err), exit_code, summary)
                } else {
                    (Ok(()), exit_code, summary)
                }
            }
            Waited::Exited(Err(e)) => {
                let err = RunError::Execution {
                    program: program.to_string(),
                    reason: format!("failed waiting for process: {e}"),
                    exit_code: None,
                    log: read_log(&request.log_file).await,
                };
                (Err(err), None, summary)
            }
            Waited::Cancelled => {
                let err = RunError::Cancelled {
                    program: program.to_string(),
                    log: read_log(&request.log_file).await,
                };
                (Err(err), None, summary)
            }
            Waited::TimedOut(timeout) => {
                let err = RunError::Timeout {
                    program: program.to_string(),
                    timeout,
                    log: read_log(&request.log_file).await,
                };
                (Err(err), None, summary)
            }
        }
    }

    async fn wait(&self, child: &mut Child, cancel: &CancellationToken) -> Waited {
        let timeout = self.options.timeout;
        let deadline = async {
            match timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            status = child.wait() => Waited::Exited(status),
            () = cancel.cancelled() => Waited::Cancelled,
            () = deadline => Waited::TimedOut(timeout.unwrap_or_default()),
        }
    }

    fn finish(
        &mut self,
        result: Result<(), RunError>,
        exit_code: Option<i32>,
        summary: TailSummary,
        log_file: Option<PathBuf>,
        started_at: DateTime<Utc>,
        start: Instant,
    ) -> RunOutcome {
        let elapsed = start.elapsed();
        let (state, error) = match result {
            Ok(()) => {
                info!(elapsed_ms = elapsed.as_millis(), units = summary.units_done, "Tool run succeeded");
                (RunState::Succeeded, None)
            }
            Err(err) => {
                error!(elapsed_ms = elapsed.as_millis(), error = %err, "Tool run failed");
                (RunState::Failed, Some(err))
            }
        };
        self.state = state;

        RunOutcome {
            success: error.is_none(),
            error,
            elapsed,
            state,
            exit_code,
            units_done: summary.units_done,
            log_file,
            started_at,
        }
    }
}

fn program_name(invocation: &Invocation) -> String {
    invocation
        .program()
        .and_then(|p| Path::new(p).file_name())
        .map_or_else(String::new, |n| n.to_string_lossy().into_owned())
}

/// Create the log file and its parents, returning two append handles for stdout and stderr.
fn open_log(path: &Path) -> std::io::Result<(std::fs::File, std::fs::File)> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let stdout = OpenOptions::new().create(true).append(true).open(path)?;
    let stderr = stdout.try_clone()?;
    Ok((stdout, stderr))
}

async fn read_log(path: &Path) -> String {
    match tokio::fs::read(path).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Log file not readable");
            String::new()
        }
    }
}
