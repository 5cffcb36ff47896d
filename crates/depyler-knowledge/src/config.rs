//! §6 Configuration — the closed JSON config key set, loaded with an
//! environment-variable overlay.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The closed set of configuration keys (§6). Fields absent from the JSON
/// file or environment keep their `Default` value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub ghidra_path: Option<String>,
    pub max_workers: Option<usize>,
    pub oracle_model: Option<String>,
    pub oracle_endpoint_url: Option<String>,
    pub oracle_api_key: Option<String>,
}

impl Config {
    /// Loads a JSON config file, then overlays matching `REFACTORY_*`
    /// environment variables on top (env wins). Unknown JSON keys are
    /// logged and ignored rather than rejected, per the closed-key-set
    /// design note — an unrecognized key is future-proofing noise, not a
    /// fatal misconfiguration.
    ///
    /// # Errors
    /// [`ConfigError::Read`] / [`ConfigError::Parse`] if the file exists
    /// but cannot be read or is not valid JSON.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut value = if path.exists() {
            let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;
            serde_json::from_str::<serde_json::Value>(&text).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?
        } else {
            serde_json::json!({})
        };

        warn_on_unknown_keys(&value);
        overlay_environment(&mut value);

        Ok(serde_json::from_value(value).unwrap_or_default())
    }

    #[must_use]
    pub fn effective_max_workers(&self, cpu_count: usize) -> usize {
        self.max_workers.unwrap_or_else(|| (2 * cpu_count).min(16))
    }
}

const KNOWN_KEYS: &[&str] = &[
    "ghidra_path",
    "max_workers",
    "oracle_model",
    "oracle_endpoint_url",
    "oracle_api_key",
];

fn warn_on_unknown_keys(value: &serde_json::Value) {
    let Some(obj) = value.as_object() else {
        return;
    };
    for key in obj.keys() {
        if !KNOWN_KEYS.contains(&key.as_str()) {
            tracing::warn!(key, "ignoring unrecognized configuration key");
        }
    }
}

fn overlay_environment(value: &mut serde_json::Value) {
    let env_overlay: BTreeMap<&str, &str> = [
        ("ghidra_path", "REFACTORY_GHIDRA_PATH"),
        ("max_workers", "REFACTORY_MAX_WORKERS"),
        ("oracle_model", "REFACTORY_ORACLE_MODEL"),
        ("oracle_endpoint_url", "REFACTORY_ORACLE_ENDPOINT_URL"),
        ("oracle_api_key", "REFACTORY_ORACLE_API_KEY"),
    ]
    .into_iter()
    .collect();

    let Some(obj) = value.as_object_mut() else {
        return;
    };

    for (key, env_var) in env_overlay {
        if let Ok(raw) = std::env::var(env_var) {
            let parsed = if key == "max_workers" {
                raw.parse::<u64>()
                    .map(serde_json::Value::from)
                    .unwrap_or(serde_json::Value::String(raw))
            } else {
                serde_json::Value::String(raw)
            };
            obj.insert(key.to_string(), parsed);
        }
    }
}
