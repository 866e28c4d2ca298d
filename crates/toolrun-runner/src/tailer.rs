//! Polling log-file tailer
//!
//! The tailer follows file growth only: it remembers a byte offset, reads
//! whatever was appended since the last poll and splits it into lines. A
//! line ends at `\n`, `\r\n` or a lone `\r`, so progress bars redrawn with
//! a carriage return do not swallow the line that follows them. A trailing
//! fragment without a terminator is held back until the rest of the line
//! arrives, or until the tailer stops. If the file shrinks below the
//! offset it was truncated or replaced, and reading restarts at 0.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::progress::{LineClass, LinePolicy, ProgressCounter};
use crate::sink::{DisplayHint, ProgressSink};

/// Default delay between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Shorter intervals are raised to this.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// What the tailer saw over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TailSummary {
    /// Complete lines read, including blank and ignored ones.
    pub lines_read: u64,
    pub units_done: u64,
    pub diagnostics: u64,
}

/// Handle to a running tailer task.
///
/// Dropping the handle without calling [`stop`](Self::stop) cancels the task
/// without the final drain.
#[derive(Debug)]
pub struct LogTailer {
    stop: CancellationToken,
    handle: Option<JoinHandle<TailSummary>>,
}

impl LogTailer {
    /// Start tailing `path` from its current end, or from 0 if it does not exist yet.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        path: impl Into<PathBuf>,
        poll_interval: Duration,
        total_units: u64,
        policy: Arc<dyn LinePolicy>,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        let path = path.into();
        let poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
        let offset = std::fs::metadata(&path).map_or(0, |m| m.len());
        debug!(path = %path.display(), offset, "Starting log tailer");

        let state = TailState {
            path,
            offset,
            pending: Vec::new(),
            counter: ProgressCounter::new(total_units),
            summary: TailSummary::default(),
            policy,
            sink,
        };

        let stop = CancellationToken::new();
        let handle = tokio::spawn(state.run(poll_interval, stop.clone()));

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Stop polling, drain what is left in the file and wait for the task.
    pub async fn stop(mut self) -> TailSummary {
        self.stop.cancel();
        let Some(handle) = self.handle.take() else {
            return TailSummary::default();
        };
        match handle.await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(error = %e, "Log tailer task failed");
                TailSummary::default()
            }
        }
    }
}

impl Drop for LogTailer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.stop.cancel();
            handle.abort();
        }
    }
}

struct TailState {
    path: PathBuf,
    offset: u64,
    pending: Vec<u8>,
    counter: ProgressCounter,
    summary: TailSummary,
    policy: Arc<dyn LinePolicy>,
    sink: Arc<dyn ProgressSink>,
}

impl TailState {
    async fn run(mut self, poll_interval: Duration, stop: CancellationToken) -> TailSummary {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = stop.cancelled() => break,
                _ = ticker.tick() => self.poll().await,
            }
        }

        self.poll().await;
        self.flush_pending();
        debug!(
            path = %self.path.display(),
            lines = self.summary.lines_read,
            units = self.summary.units_done,
            "Log tailer stopped"
        );
        self.summary
    }

    async fn poll(&mut self) {
        match read_appended(&self.path, &mut self.offset).await {
            Ok(Some(bytes)) => {
                self.pending.extend_from_slice(&bytes);
                self.dispatch_complete_lines();
            }
            Ok(None) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to read log file"),
        }
    }

    fn dispatch_complete_lines(&mut self) {
        while let Some(end) = self.pending.iter().position(|b| matches!(b, b'\n' | b'\r')) {
            let terminator = match (self.pending[end], self.pending.get(end + 1)) {
                (b'\r', Some(b'\n')) => 2,
                // A `\r` at the end of the buffer may be half of `\r\n`.
                (b'\r', None) => return,
                _ => 1,
            };
            let line: Vec<u8> = self.pending.drain(..end + terminator).collect();
            self.handle_line(&line[..end]);
        }
    }

    fn flush_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let mut line = std::mem::take(&mut self.pending);
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        self.handle_line(&line);
    }

    fn handle_line(&mut self, raw: &[u8]) {
        let line = String::from_utf8_lossy(raw);
        self.summary.lines_read += 1;

        match self.policy.classify(&line) {
            LineClass::Progress => {
                if let Some(fraction) = self.counter.advance() {
                    self.summary.units_done = self.counter.done();
                    self.sink.set_progress(fraction);
                }
            }
            LineClass::Diagnostic => {
                self.summary.diagnostics += 1;
                self.sink.log(&line, DisplayHint::ToolOutput);
            }
            LineClass::Ignore => {}
        }
    }
}

/// Read everything appended after `offset` and advance it.
///
/// Returns `Ok(None)` when nothing new is available.
async fn read_appended(path: &Path, offset: &mut u64) -> std::io::Result<Option<Vec<u8>>> {
    let mut file = tokio::fs::File::open(path).await?;
    let len = file.metadata().await?.len();

    if len < *offset {
        debug!(path = %path.display(), old = *offset, new = len, "Log file truncated, rereading");
        *offset = 0;
    }
    if len == *offset {
        return Ok(None);
    }

    file.seek(SeekFrom::Start(*offset)).await?;
    let mut buf = Vec::new();
    let read = file.read_to_end(&mut buf).await?;
    *offset += read as u64;
    Ok(Some(buf))
}
