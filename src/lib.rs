//! toolrun - declarative command lines and monitored runs for external tools
//!
//! toolrun can be used in two ways:
//! - **CLI**: `toolrun delta <dir>`, `toolrun exec --units N -- <cmd>...`, `toolrun config`
//! - **Library**: declare arguments, build an invocation and run it with a progress sink
//!
//! # Quick Start (Library)
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use toolrun::delta::DeltaCli;
//! use toolrun::runner::{RunnerOptions, ToolRunner, TracingSink};
//!
//! let dir = Path::new("/data/movie");
//! let mut cli = DeltaCli::new();
//! cli.set_paths(dir).unwrap();
//!
//! let mut runner = ToolRunner::new(RunnerOptions::default());
//! let outcome = runner.run(cli.invocation(), dir, dir.join("delta2.log"), 40, Arc::new(TracingSink));
//! println!("success: {} in {:?}", outcome.success, outcome.elapsed);
//! ```
//!
//! # Crates
//!
//! - [`args`]: argument declarations, invocation building, settings persistence
//! - [`runner`]: process launch, log tailing, progress, cancellation
//! - [`config`]: TOML configuration with source attribution
//!
//! # Exit Codes
//!
//! See [`ExitCode`] for the table used by the binary.

pub mod cli;
pub mod delta;
pub mod error;
pub mod exit_codes;
pub mod logging;

pub use error::{ToolrunError, UserFriendlyError};
pub use exit_codes::ExitCode;

pub use toolrun_args as args;
pub use toolrun_config as config;
pub use toolrun_runner as runner;
