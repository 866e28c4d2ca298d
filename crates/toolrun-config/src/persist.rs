use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

use crate::model::Config;

impl Config {
    /// Write `values` as the `[arguments]` table of the config file at `path`.
    ///
    /// Other tables in an existing file are preserved. Missing parent
    /// directories are created. Values that have no TOML representation
    /// (such as `null`) are skipped.
    pub fn save_arguments(
        path: &Path,
        values: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<()> {
        let mut document: toml::Table = match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => toml::Table::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read config file: {}", path.display()));
            }
        };

        let mut arguments = toml::Table::new();
        for (key, value) in values {
            match toml::Value::try_from(value) {
                Ok(converted) => {
                    arguments.insert(key.clone(), converted);
                }
                Err(e) => debug!(key = %key, error = %e, "Skipping argument without TOML form"),
            }
        }
        document.insert("arguments".to_string(), toml::Value::Table(arguments));

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let rendered = toml::to_string_pretty(&document).context("Failed to render config")?;
        std::fs::write(path, rendered)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        debug!(path = %path.display(), count = values.len(), "Saved argument values");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CliArgs;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_save_creates_file_and_round_trips() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".toolrun").join("config.toml");
        let values = json!({"MIN_CELL_AREA": 35, "MODEL": "2D"})
            .as_object()
            .cloned()
            .unwrap();

        Config::save_arguments(&path, &values).unwrap();

        let cli = CliArgs {
            config_path: Some(path),
            ..CliArgs::default()
        };
        let config = Config::discover_from(temp.path(), &cli).unwrap();
        assert_eq!(config.arguments, values);
    }

    #[test]
    fn test_save_preserves_other_tables() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            "[runner]\npoll_interval_ms = 50\n\n[arguments]\nOLD = 1\n",
        )
        .unwrap();

        let values = json!({"MIN_CELL_AREA": 5}).as_object().cloned().unwrap();
        Config::save_arguments(&path, &values).unwrap();

        let cli = CliArgs {
            config_path: Some(path),
            ..CliArgs::default()
        };
        let config = Config::discover_from(temp.path(), &cli).unwrap();
        assert_eq!(config.runner.poll_interval_ms, Some(50));
        assert_eq!(config.arguments, values);
    }
}
