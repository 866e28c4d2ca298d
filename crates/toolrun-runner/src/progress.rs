//! Log line classification and progress counting

use once_cell::sync::Lazy;
use regex::Regex;

static IMAGE_PROGRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^image ([0-9]+)/([0-9]+)").expect("valid progress regex"));

/// What a log line means to the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    /// One unit of work finished.
    Progress,
    /// Text worth showing to the user.
    Diagnostic,
    /// Blank or malformed; dropped.
    Ignore,
}

/// Decides how each complete log line is treated.
pub trait LinePolicy: Send + Sync {
    fn classify(&self, line: &str) -> LineClass;
}

/// Counts lines of the form `image <n>/<m>` at the start of a line.
///
/// Trailing text after the counter is allowed. A match whose numbers do not
/// parse, or where `n > m`, is ignored rather than counted or forwarded.
/// Any other non-blank line is a diagnostic.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageProgressPolicy;

impl LinePolicy for ImageProgressPolicy {
    fn classify(&self, line: &str) -> LineClass {
        if let Some(caps) = IMAGE_PROGRESS.captures(line) {
            let done = caps[1].parse::<u64>();
            let total = caps[2].parse::<u64>();
            return match (done, total) {
                (Ok(done), Ok(total)) if done <= total => LineClass::Progress,
                _ => LineClass::Ignore,
            };
        }
        if line.trim().is_empty() {
            LineClass::Ignore
        } else {
            LineClass::Diagnostic
        }
    }
}

/// Monotonic done counter capped at the expected total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressCounter {
    done: u64,
    total: u64,
}

impl ProgressCounter {
    #[must_use]
    pub const fn new(total: u64) -> Self {
        Self { done: 0, total }
    }

    #[must_use]
    pub const fn done(&self) -> u64 {
        self.done
    }

    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Count one unit and return the new fraction.
    ///
    /// Returns `None` when the total is zero or already reached, so callers
    /// never report the same fraction twice.
    #[allow(clippy::cast_precision_loss)]
    pub fn advance(&mut self) -> Option<f64> {
        if self.done >= self.total {
            return None;
        }
        self.done += 1;
        Some(self.done as f64 / self.total as f64)
    }
}
