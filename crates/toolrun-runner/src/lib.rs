//! Process execution with log-file progress monitoring
//!
//! [`ToolRunner`] launches a built [`Invocation`](toolrun_args::Invocation)
//! with stdout and stderr appended to a log file, tails that file while the
//! child runs, and reports progress and diagnostic lines to a
//! [`ProgressSink`]. Every run ends in a [`RunOutcome`]; the tailer is always
//! stopped before the outcome is returned.
//!
//! # Security Model
//!
//! All process execution goes through [`CommandSpec`], which passes arguments
//! as discrete argv elements. No shell is involved.

pub mod command_spec;
pub mod error;
pub mod progress;
pub mod runner;
pub mod sink;
pub mod tailer;
pub mod workdir;

mod platform;

pub use command_spec::CommandSpec;
pub use error::{RunError, RunErrorKind};
pub use progress::{ImageProgressPolicy, LineClass, LinePolicy, ProgressCounter};
pub use runner::{RunOutcome, RunRequest, RunState, RunnerOptions, ToolRunner};
pub use sink::{DisplayHint, NoopSink, ProgressSink, TracingSink};
pub use tailer::{LogTailer, TailSummary};
pub use workdir::WorkDir;

/// Re-exported so callers can cancel runs without depending on `tokio-util` directly.
pub use tokio_util::sync::CancellationToken;
