use crate::error::ConfigError;
use crate::model::Config;

pub(crate) const MIN_POLL_INTERVAL_MS: u64 = 10;
pub(crate) const MAX_POLL_INTERVAL_MS: u64 = 10_000;

impl Config {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(interval) = self.runner.poll_interval_ms
            && !(MIN_POLL_INTERVAL_MS..=MAX_POLL_INTERVAL_MS).contains(&interval)
        {
            return Err(ConfigError::InvalidValue {
                key: "poll_interval_ms".to_string(),
                value: format!(
                    "must be between {MIN_POLL_INTERVAL_MS} and {MAX_POLL_INTERVAL_MS} milliseconds"
                ),
            });
        }

        if self.runner.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "timeout_secs".to_string(),
                value: "must be greater than 0 (omit it to disable the timeout)".to_string(),
            });
        }

        if let Some(log_file_name) = &self.runner.log_file_name
            && (log_file_name.trim().is_empty()
                || log_file_name.contains('/')
                || log_file_name.contains('\\'))
        {
            return Err(ConfigError::InvalidValue {
                key: "log_file_name".to_string(),
                value: "must be a plain, non-empty file name".to_string(),
            });
        }

        if let Some(command) = &self.tool.command
            && command.trim().is_empty()
        {
            return Err(ConfigError::InvalidValue {
                key: "command".to_string(),
                value: "must not be empty".to_string(),
            });
        }

        if let Some(env) = &self.tool.conda_env
            && env.trim().is_empty()
        {
            return Err(ConfigError::InvalidValue {
                key: "conda_env".to_string(),
                value: "must not be empty".to_string(),
            });
        }

        Ok(())
    }
}
