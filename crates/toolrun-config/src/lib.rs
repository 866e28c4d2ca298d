//! Configuration for toolrun
//!
//! Values come from three layers with precedence CLI > config file > defaults.
//! The config file is `.toolrun/config.toml`, found by searching upward from
//! the working directory (stopping at a repository root), or named explicitly
//! with `--config` or the `TOOLRUN_CONFIG` environment variable.
//!
//! ```toml
//! [runner]
//! poll_interval_ms = 200
//! timeout_secs = 3600
//! kill_grace_ms = 5000
//! check_exit_code = true
//! keep_workdir = false
//! log_file_name = "delta2.log"
//!
//! [tool]
//! command = "delta run"
//! conda_env = "delta_env"
//!
//! [arguments]
//! MIN_CELL_AREA = 20
//! ```

mod builder;
mod discovery;
mod error;
mod model;
mod persist;
mod sources;
mod validation;

pub use builder::ConfigBuilder;
pub use discovery::{CONFIG_DIR, CONFIG_ENV_VAR, CONFIG_FILE};
pub use error::ConfigError;
pub use model::{
    CliArgs, Config, DEFAULT_COMMAND, DEFAULT_KILL_GRACE_MS, DEFAULT_LOG_FILE_NAME,
    DEFAULT_POLL_INTERVAL_MS, RunnerConfig, ToolConfig,
};
pub use sources::ConfigSource;
