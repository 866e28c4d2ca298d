//! Observers for run progress

use tracing::info;

/// How a logged line should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayHint {
    /// Shown as-is, such as the header before the echoed command line.
    Plain,
    /// A command token echoed before launch.
    Command,
    /// An echoed token that looks like a filesystem path.
    Path,
    /// A diagnostic line read from the tool's log.
    ToolOutput,
    Error,
}

/// Receives progress and diagnostics during a run.
///
/// Callbacks come from the tailer task, so implementations must be
/// thread-safe. No callback is made after the run outcome is returned.
pub trait ProgressSink: Send + Sync {
    /// Fraction of work done, in `[0.0, 1.0]`.
    fn set_progress(&self, fraction: f64);

    fn log(&self, line: &str, hint: DisplayHint);

    fn set_status(&self, _status: &str) {}
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn set_progress(&self, _fraction: f64) {}

    fn log(&self, _line: &str, _hint: DisplayHint) {}
}

/// Forwards callbacks to `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn set_progress(&self, fraction: f64) {
        info!(progress = fraction, "Progress");
    }

    fn log(&self, line: &str, hint: DisplayHint) {
        match hint {
            DisplayHint::ToolOutput => info!(target: "toolrun::tool", " - {line}"),
            DisplayHint::Error => tracing::error!("{line}"),
            DisplayHint::Plain | DisplayHint::Command | DisplayHint::Path => info!("{line}"),
        }
    }

    fn set_status(&self, status: &str) {
        info!(status, "Status");
    }
}
