//! Terminal rendering of run progress
//!
//! Everything goes to stderr. On a terminal the progress bar is redrawn in
//! place and cleared before any other line is printed.

use std::io::{IsTerminal, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crossterm::style::{Color, Stylize};
use crossterm::terminal::{Clear, ClearType};

use toolrun_runner::{DisplayHint, ProgressSink};

const BAR_WIDTH: usize = 30;

#[derive(Default)]
struct ConsoleState {
    /// Echoed command tokens waiting to be printed as one line.
    tokens: Vec<(String, DisplayHint)>,
    bar_visible: bool,
    last_percent: Option<u64>,
}

/// Sink that renders progress and tool output for a human.
pub struct ConsoleSink {
    interactive: bool,
    color: bool,
    state: Mutex<ConsoleState>,
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleSink {
    #[must_use]
    pub fn new() -> Self {
        let interactive = std::io::stderr().is_terminal();
        Self {
            interactive,
            color: use_color(interactive),
            state: Mutex::new(ConsoleState::default()),
        }
    }

    /// Leave the progress bar on screen and move to a fresh line.
    pub fn finish(&self) {
        let mut state = self.lock();
        self.flush_tokens(&mut state);
        if state.bar_visible {
            eprintln!();
            state.bar_visible = false;
        }
    }

    fn lock(&self) -> MutexGuard<'_, ConsoleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn clear_bar(&self, state: &mut ConsoleState) {
        if state.bar_visible {
            let mut stderr = std::io::stderr();
            let _ = crossterm::execute!(stderr, Clear(ClearType::CurrentLine));
            let _ = write!(stderr, "\r");
            state.bar_visible = false;
        }
    }

    fn flush_tokens(&self, state: &mut ConsoleState) {
        if state.tokens.is_empty() {
            return;
        }
        self.clear_bar(state);
        let line = state
            .tokens
            .drain(..)
            .map(|(token, hint)| match hint {
                DisplayHint::Path => token,
                _ => self.paint(&token, Color::Green),
            })
            .collect::<Vec<_>>()
            .join(" ");
        eprintln!("  {line}");
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.with(color).to_string()
        } else {
            text.to_string()
        }
    }
}

impl ProgressSink for ConsoleSink {
    fn set_progress(&self, fraction: f64) {
        let fraction = fraction.clamp(0.0, 1.0);
        let percent = (fraction * 100.0).round() as u64;

        let mut state = self.lock();
        self.flush_tokens(&mut state);
        if state.last_percent == Some(percent) {
            return;
        }
        state.last_percent = Some(percent);

        let filled = ((fraction * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
        let bar = format!("[{}{}] {percent:>3}%", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled));
        if self.interactive {
            self.clear_bar(&mut state);
            let mut stderr = std::io::stderr();
            let _ = write!(stderr, "\r{bar}");
            let _ = stderr.flush();
            state.bar_visible = true;
        } else {
            eprintln!("{bar}");
        }
    }

    fn log(&self, line: &str, hint: DisplayHint) {
        let mut state = self.lock();
        if matches!(hint, DisplayHint::Command | DisplayHint::Path) {
            state.tokens.push((line.to_string(), hint));
            return;
        }

        self.flush_tokens(&mut state);
        self.clear_bar(&mut state);
        match hint {
            DisplayHint::ToolOutput => eprintln!(" - {line}"),
            DisplayHint::Error => eprintln!("{}", self.paint(line, Color::Red)),
            _ => eprintln!("{line}"),
        }
    }

    fn set_status(&self, status: &str) {
        let mut state = self.lock();
        self.flush_tokens(&mut state);
        self.clear_bar(&mut state);
        if self.color {
            eprintln!("{}", status.bold());
        } else {
            eprintln!("{status}");
        }
    }
}

/// Print an error and its suggestions to stderr.
pub fn print_error(message: &str, suggestions: &[String]) {
    let color = use_color(std::io::stderr().is_terminal());
    let mark = if color {
        "✗".red().to_string()
    } else {
        "✗".to_string()
    };
    eprintln!("{mark} {message}");
    if !suggestions.is_empty() {
        eprintln!();
        eprintln!("  Suggestions:");
        for suggestion in suggestions {
            eprintln!("    - {suggestion}");
        }
    }
}

fn use_color(interactive: bool) -> bool {
    interactive && std::env::var_os("NO_COLOR").is_none()
}
