//! # Persistence Module
//!
//! Defines the [`Configuration`] record that survives restarts and the stores that
//! load and save it. The engine treats persistence as fire-and-forget: a failed
//! load means "no saved state", a failed save is logged and skipped.
//!
//! ## Formats
//! - On disk the configuration is TOML (see [`store::TomlFileStore`]).
//! - `export`/`import` use JSON so configurations can be moved through the bridge.
//!
//! Every field has a default, so partial documents merge shallowly over the
//! built-in configuration and unknown fields are ignored.

pub mod persistence_worker;
pub mod store;

use crate::controller::{ControllerProfile, Sensitivity};
use crate::mapping::{KeyMapTable, SuppressionScope};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use persistence_worker::{PersistenceAction, PersistenceWorker, WorkerStore};
pub use store::{default_config_path, ConfigStore, MemoryStore, TomlFileStore};

/// Everything the engine persists between sessions.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Configuration {
    /// Input routing switch, independent of the connection
    pub enabled: bool,
    /// Whether the virtual controller is plugged in
    pub connected: bool,
    pub controller_type: ControllerProfile,
    pub sensitivity: Sensitivity,
    /// Blocking policy: hide mapped keys from the host page
    pub block_keyboard_inputs: bool,
    pub suppression_scope: SuppressionScope,
    pub key_mappings: KeyMapTable,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            enabled: false,
            connected: false,
            controller_type: ControllerProfile::default(),
            sensitivity: Sensitivity::default(),
            block_keyboard_inputs: true,
            suppression_scope: SuppressionScope::default(),
            key_mappings: KeyMapTable::default_table(),
        }
    }
}

impl Configuration {
    /// Pretty JSON, the format accepted by [`Configuration::merged_with`]
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Shallow-merges a JSON object over this configuration.
    ///
    /// Top-level fields present in `json` replace the current ones wholesale, the
    /// rest are kept. Any invalid field rejects the whole document.
    pub fn merged_with(&self, json: &str) -> Result<Configuration, ConfigError> {
        let Value::Object(patch) = serde_json::from_str::<Value>(json)? else {
            return Err(ConfigError::NotAnObject);
        };
        let mut base = serde_json::to_value(self)?;
        if let Value::Object(fields) = &mut base {
            fields.extend(patch);
        }
        Ok(serde_json::from_value(base)?)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration format: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration format: expected a JSON object")]
    NotAnObject,
}

/// Failures at the persistence boundary
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to access configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Persistence worker unavailable: {0}")]
    WorkerUnavailable(String),
}
