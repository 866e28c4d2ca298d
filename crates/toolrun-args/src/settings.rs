//! Persisting argument values by key
//!
//! Only arguments declared with a key take part. Values are stored as plain
//! JSON scalars so the map can live in any serde-backed settings file.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ArgumentError;
use crate::invocation::Invocation;

impl Invocation {
    /// Snapshot of every keyed argument that has an effective value.
    #[must_use]
    pub fn settings(&self) -> Map<String, Value> {
        self.arguments()
            .iter()
            .filter_map(|arg| Some((arg.key()?.to_string(), arg.value()?.to_json())))
            .collect()
    }

    /// Restore values from a map produced by [`settings`](Self::settings).
    ///
    /// Unknown keys are ignored. A value of the wrong shape fails the whole
    /// call before anything is applied. Returns the number of arguments set.
    pub fn apply_settings(&mut self, settings: &Map<String, Value>) -> Result<usize, ArgumentError> {
        let mut updates = Vec::new();

        for (index, arg) in self.arguments().iter().enumerate() {
            let Some(key) = arg.key() else { continue };
            let Some(json) = settings.get(key) else { continue };

            let value = arg
                .kind()
                .from_json(json)
                .ok_or_else(|| ArgumentError::InvalidSetting {
                    key: key.to_string(),
                    expected: arg.kind().as_str(),
                    found: json.to_string(),
                })?;
            arg.check_value(&value)?;
            updates.push((index, value));
        }

        for key in settings.keys() {
            if !self.arguments().iter().any(|a| a.key() == Some(key.as_str())) {
                debug!(key = %key, "Ignoring unknown setting");
            }
        }

        let arguments = self.arguments_mut();
        for (index, value) in &updates {
            arguments[*index].set_value(value.clone())?;
        }
        Ok(updates.len())
    }
}
