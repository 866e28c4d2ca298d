use std::time::Duration;

use crate::error::ConfigError;
use crate::model::Config;
use crate::sources::ConfigSource;

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// # Example
    ///
    /// ```rust
    /// use toolrun_config::Config;
    /// use std::time::Duration;
    ///
    /// let config = Config::builder()
    ///     .poll_interval(Duration::from_millis(100))
    ///     .timeout(Duration::from_secs(3600))
    ///     .conda_env("delta_env")
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(config.tool.launcher()[0], "conda");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for [`Config`] that never reads files or the environment.
///
/// Values set here are attributed to [`ConfigSource::Programmatic`].
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    poll_interval: Option<Duration>,
    timeout: Option<Duration>,
    kill_grace: Option<Duration>,
    check_exit_code: Option<bool>,
    keep_workdir: Option<bool>,
    log_file_name: Option<String>,
    command: Option<String>,
    conda_env: Option<String>,
    arguments: serde_json::Map<String, serde_json::Value>,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub const fn kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = Some(grace);
        self
    }

    #[must_use]
    pub const fn check_exit_code(mut self, check: bool) -> Self {
        self.check_exit_code = Some(check);
        self
    }

    #[must_use]
    pub const fn keep_workdir(mut self, keep: bool) -> Self {
        self.keep_workdir = Some(keep);
        self
    }

    #[must_use]
    pub fn log_file_name(mut self, name: impl Into<String>) -> Self {
        self.log_file_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    #[must_use]
    pub fn conda_env(mut self, env: impl Into<String>) -> Self {
        self.conda_env = Some(env.into());
        self
    }

    /// Persisted value for the argument with `key`.
    #[must_use]
    pub fn argument(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.arguments.insert(key.into(), value);
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<Config, ConfigError> {
        let mut config = Config::default();
        let mut mark = |key: &str| {
            config
                .source_attribution
                .insert(key.to_string(), ConfigSource::Programmatic);
        };

        if self.poll_interval.is_some() {
            mark("poll_interval_ms");
        }
        if self.timeout.is_some() {
            mark("timeout_secs");
        }
        if self.kill_grace.is_some() {
            mark("kill_grace_ms");
        }
        if self.check_exit_code.is_some() {
            mark("check_exit_code");
        }
        if self.keep_workdir.is_some() {
            mark("keep_workdir");
        }
        if self.log_file_name.is_some() {
            mark("log_file_name");
        }
        if self.command.is_some() {
            mark("command");
        }
        if self.conda_env.is_some() {
            mark("conda_env");
        }
        for key in self.arguments.keys() {
            mark(&format!("arguments.{key}"));
        }

        if let Some(interval) = self.poll_interval {
            config.runner.poll_interval_ms = Some(duration_millis(interval));
        }
        if let Some(timeout) = self.timeout {
            config.runner.timeout_secs = Some(timeout.as_secs());
        }
        if let Some(grace) = self.kill_grace {
            config.runner.kill_grace_ms = Some(duration_millis(grace));
        }
        if self.check_exit_code.is_some() {
            config.runner.check_exit_code = self.check_exit_code;
        }
        if self.keep_workdir.is_some() {
            config.runner.keep_workdir = self.keep_workdir;
        }
        if self.log_file_name.is_some() {
            config.runner.log_file_name = self.log_file_name;
        }
        if self.command.is_some() {
            config.tool.command = self.command;
        }
        config.tool.conda_env = self.conda_env;
        config.arguments = self.arguments;

        config.validate()?;
        Ok(config)
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults_match_default_config() {
        let config = ConfigBuilder::new().build().unwrap();
        assert_eq!(config.runner, Config::default().runner);
        assert_eq!(config.tool, Config::default().tool);
    }

    #[test]
    fn test_builder_marks_programmatic_source() {
        let config = Config::builder()
            .poll_interval(Duration::from_millis(50))
            .argument("MIN_CELL_AREA", serde_json::json!(12))
            .build()
            .unwrap();

        assert_eq!(config.runner.poll_interval_ms, Some(50));
        assert_eq!(
            config.source_attribution.get("poll_interval_ms"),
            Some(&ConfigSource::Programmatic)
        );
        assert_eq!(
            config.source_attribution.get("arguments.MIN_CELL_AREA"),
            Some(&ConfigSource::Programmatic)
        );
        assert_eq!(
            config.source_attribution.get("kill_grace_ms"),
            Some(&ConfigSource::Defaults)
        );
    }

    #[test]
    fn test_builder_validates() {
        let err = Config::builder()
            .poll_interval(Duration::from_millis(1))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        assert!(Config::builder().command("").build().is_err());
    }
}
