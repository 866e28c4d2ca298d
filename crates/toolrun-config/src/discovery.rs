use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::model::{CliArgs, Config, RunnerConfig, ToolConfig};
use crate::sources::ConfigSource;

/// Directory holding the config file.
pub const CONFIG_DIR: &str = ".toolrun";
pub const CONFIG_FILE: &str = "config.toml";
/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "TOOLRUN_CONFIG";

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TomlConfig {
    pub(crate) runner: Option<RunnerConfig>,
    pub(crate) tool: Option<ToolConfig>,
    pub(crate) arguments: Option<toml::Table>,
}

impl Config {
    /// Discover and load configuration with precedence: CLI > file > defaults
    ///
    /// Without `--config`, the `TOOLRUN_CONFIG` environment variable is
    /// consulted before searching upward from the current directory.
    pub fn discover(cli_args: &CliArgs) -> Result<Self> {
        let start_dir = std::env::current_dir().context("Failed to get current directory")?;

        let mut cli_args = cli_args.clone();
        if cli_args.config_path.is_none()
            && let Some(path) = std::env::var_os(CONFIG_ENV_VAR).filter(|p| !p.is_empty())
        {
            cli_args.config_path = Some(PathBuf::from(path));
        }

        Self::discover_from(&start_dir, &cli_args)
    }

    /// Discover and load configuration starting from a specific directory
    ///
    /// Does not read the environment, so tests can call it without touching
    /// process-global state.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self> {
        let mut config = Self::default();

        let config_path = match &cli_args.config_path {
            Some(explicit) => Some(explicit.clone()),
            None => Self::discover_config_file_from(start_dir),
        };

        if let Some(path) = &config_path {
            let file_config = Self::load_config_file(path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))?;
            config.apply_file(file_config, ConfigSource::ConfigFile(path.clone()));
            config.config_path = Some(path.clone());
            debug!(path = %path.display(), "Loaded config file");
        }

        config.apply_cli(cli_args);
        config.validate()?;

        Ok(config)
    }

    /// Search upward from `start_dir` for `.toolrun/config.toml`.
    ///
    /// Stops at repository root markers (.git, .hg, .svn) or the filesystem root.
    #[must_use]
    pub fn discover_config_file_from(start_dir: &Path) -> Option<PathBuf> {
        for dir in start_dir.ancestors() {
            let candidate = dir.join(CONFIG_DIR).join(CONFIG_FILE);
            if candidate.is_file() {
                return Some(candidate);
            }

            if dir.join(".git").exists() || dir.join(".hg").exists() || dir.join(".svn").exists()
            {
                break;
            }
        }
        None
    }

    fn load_config_file(path: &Path) -> Result<TomlConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;
        Ok(config)
    }

    fn apply_file(&mut self, file: TomlConfig, source: ConfigSource) {
        if let Some(runner) = file.runner {
            self.set_from(source.clone(), "poll_interval_ms", runner.poll_interval_ms, |c, v| {
                c.runner.poll_interval_ms = Some(v);
            });
            self.set_from(source.clone(), "timeout_secs", runner.timeout_secs, |c, v| {
                c.runner.timeout_secs = Some(v);
            });
            self.set_from(source.clone(), "kill_grace_ms", runner.kill_grace_ms, |c, v| {
                c.runner.kill_grace_ms = Some(v);
            });
            self.set_from(source.clone(), "check_exit_code", runner.check_exit_code, |c, v| {
                c.runner.check_exit_code = Some(v);
            });
            self.set_from(source.clone(), "keep_workdir", runner.keep_workdir, |c, v| {
                c.runner.keep_workdir = Some(v);
            });
            self.set_from(source.clone(), "log_file_name", runner.log_file_name, |c, v| {
                c.runner.log_file_name = Some(v);
            });
        }

        if let Some(tool) = file.tool {
            self.set_from(source.clone(), "command", tool.command, |c, v| {
                c.tool.command = Some(v);
            });
            self.set_from(source.clone(), "conda_env", tool.conda_env, |c, v| {
                c.tool.conda_env = Some(v);
            });
        }

        if let Some(arguments) = file.arguments {
            for (key, value) in arguments {
                match serde_json::to_value(&value) {
                    Ok(json) => {
                        self.source_attribution
                            .insert(format!("arguments.{key}"), source.clone());
                        self.arguments.insert(key, json);
                    }
                    Err(e) => debug!(key = %key, error = %e, "Skipping unconvertible argument value"),
                }
            }
        }
    }

    fn apply_cli(&mut self, cli: &CliArgs) {
        let source = ConfigSource::Cli;
        self.set_from(source.clone(), "poll_interval_ms", cli.poll_interval_ms, |c, v| {
            c.runner.poll_interval_ms = Some(v);
        });
        self.set_from(source.clone(), "timeout_secs", cli.timeout_secs, |c, v| {
            c.runner.timeout_secs = Some(v);
        });
        self.set_from(source.clone(), "kill_grace_ms", cli.kill_grace_ms, |c, v| {
            c.runner.kill_grace_ms = Some(v);
        });
        self.set_from(source.clone(), "check_exit_code", cli.check_exit_code, |c, v| {
            c.runner.check_exit_code = Some(v);
        });
        self.set_from(source.clone(), "keep_workdir", cli.keep_workdir, |c, v| {
            c.runner.keep_workdir = Some(v);
        });
        self.set_from(source.clone(), "command", cli.command.clone(), |c, v| {
            c.tool.command = Some(v);
        });
        self.set_from(source, "conda_env", cli.conda_env.clone(), |c, v| {
            c.tool.conda_env = Some(v);
        });
    }

    fn set_from<T>(
        &mut self,
        source: ConfigSource,
        key: &str,
        value: Option<T>,
        apply: impl FnOnce(&mut Self, T),
    ) {
        if let Some(value) = value {
            apply(self, value);
            self.source_attribution.insert(key.to_string(), source);
        }
    }
}
