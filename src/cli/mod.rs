//! Command-line interface for toolrun
//!
//! - `args`: clap definitions
//! - `run`: entry point and dispatch
//! - `commands`: command implementations
//! - `console`: terminal progress sink

pub mod args;
mod commands;
pub mod console;
mod run;

pub use args::{Cli, Commands, DeltaArgs, ExecArgs};
pub use commands::EXEC_LOG_FILE_NAME;
pub use console::ConsoleSink;
pub use run::run;
