use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::sources::ConfigSource;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 200;
pub const DEFAULT_KILL_GRACE_MS: u64 = 5000;
pub const DEFAULT_LOG_FILE_NAME: &str = "delta2.log";
pub const DEFAULT_COMMAND: &str = "delta run";

/// `[runner]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    pub poll_interval_ms: Option<u64>,
    /// No timeout when unset.
    pub timeout_secs: Option<u64>,
    pub kill_grace_ms: Option<u64>,
    pub check_exit_code: Option<bool>,
    /// Keep temporary working directories after the run.
    pub keep_workdir: Option<bool>,
    pub log_file_name: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: Some(DEFAULT_POLL_INTERVAL_MS),
            timeout_secs: None,
            kill_grace_ms: Some(DEFAULT_KILL_GRACE_MS),
            check_exit_code: Some(true),
            keep_workdir: Some(false),
            log_file_name: Some(DEFAULT_LOG_FILE_NAME.to_string()),
        }
    }
}

impl RunnerConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS))
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    #[must_use]
    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms.unwrap_or(DEFAULT_KILL_GRACE_MS))
    }

    #[must_use]
    pub fn check_exit_code(&self) -> bool {
        self.check_exit_code.unwrap_or(true)
    }

    #[must_use]
    pub fn keep_workdir(&self) -> bool {
        self.keep_workdir.unwrap_or(false)
    }

    #[must_use]
    pub fn log_file_name(&self) -> &str {
        self.log_file_name.as_deref().unwrap_or(DEFAULT_LOG_FILE_NAME)
    }
}

/// `[tool]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ToolConfig {
    /// Base command, split on whitespace.
    pub command: Option<String>,
    /// Run the tool through `conda run -n <env>`.
    pub conda_env: Option<String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            command: Some(DEFAULT_COMMAND.to_string()),
            conda_env: None,
        }
    }
}

impl ToolConfig {
    #[must_use]
    pub fn command(&self) -> &str {
        self.command.as_deref().unwrap_or(DEFAULT_COMMAND)
    }

    /// Launcher tokens placed before the base command.
    #[must_use]
    pub fn launcher(&self) -> Vec<String> {
        match &self.conda_env {
            Some(env) => vec![
                "conda".to_string(),
                "run".to_string(),
                "--no-capture-output".to_string(),
                "-n".to_string(),
                env.clone(),
            ],
            None => Vec::new(),
        }
    }
}

/// Overrides collected from the command line.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub poll_interval_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub kill_grace_ms: Option<u64>,
    pub check_exit_code: Option<bool>,
    pub keep_workdir: Option<bool>,
    pub command: Option<String>,
    pub conda_env: Option<String>,
}

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub runner: RunnerConfig,
    pub tool: ToolConfig,
    /// Persisted argument values keyed by argument key.
    pub arguments: serde_json::Map<String, serde_json::Value>,
    /// File the values were loaded from, if any.
    pub config_path: Option<PathBuf>,
    pub source_attribution: HashMap<String, ConfigSource>,
}

impl Default for Config {
    fn default() -> Self {
        let mut source_attribution = HashMap::new();
        for key in DEFAULT_KEYS {
            source_attribution.insert((*key).to_string(), ConfigSource::Defaults);
        }
        Self {
            runner: RunnerConfig::default(),
            tool: ToolConfig::default(),
            arguments: serde_json::Map::new(),
            config_path: None,
            source_attribution,
        }
    }
}

pub(crate) const DEFAULT_KEYS: &[&str] = &[
    "poll_interval_ms",
    "kill_grace_ms",
    "check_exit_code",
    "keep_workdir",
    "log_file_name",
    "command",
];
