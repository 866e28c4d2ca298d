use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::model::Config;

/// Where a configuration value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Cli,
    ConfigFile(PathBuf),
    /// Set through [`ConfigBuilder`](crate::ConfigBuilder).
    Programmatic,
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::ConfigFile(path) => write!(f, "config file ({})", path.display()),
            Self::Programmatic => write!(f, "programmatic"),
            Self::Defaults => write!(f, "defaults"),
        }
    }
}

impl Config {
    /// Effective values as `key -> (value, source)`, sorted by key.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut config = BTreeMap::new();

        let mut add = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                let source = self
                    .source_attribution
                    .get(key)
                    .unwrap_or(&ConfigSource::Defaults)
                    .to_string();
                config.insert(key.to_string(), (value, source));
            }
        };

        let runner = &self.runner;
        add("poll_interval_ms", runner.poll_interval_ms.map(|v| v.to_string()));
        add("timeout_secs", runner.timeout_secs.map(|v| v.to_string()));
        add("kill_grace_ms", runner.kill_grace_ms.map(|v| v.to_string()));
        add("check_exit_code", runner.check_exit_code.map(|v| v.to_string()));
        add("keep_workdir", runner.keep_workdir.map(|v| v.to_string()));
        add("log_file_name", runner.log_file_name.clone());
        add("command", self.tool.command.clone());
        add("conda_env", self.tool.conda_env.clone());

        for (key, value) in &self.arguments {
            add(&format!("arguments.{key}"), Some(value.to_string()));
        }

        config
    }
}
