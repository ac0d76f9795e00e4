use super::{Configuration, PersistenceError};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

const CONFIG_DIR: &str = ".config/virtualpad";
const CONFIG_FILE: &str = "config.toml";

/// Load/save collaborator of the engine
pub trait ConfigStore: Send {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<Configuration>, PersistenceError>;

    fn save(&self, config: &Configuration) -> Result<(), PersistenceError>;
}

/// Keeps the last saved configuration in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    saved: Arc<Mutex<Option<Configuration>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Configuration) -> Self {
        Self {
            saved: Arc::new(Mutex::new(Some(config))),
        }
    }

    /// Last saved configuration, shared between clones
    pub fn saved(&self) -> Option<Configuration> {
        match self.saved.lock() {
            Ok(guard) => guard.clone(),
            Err(e) => {
                warn!("Memory store poisoned: {}", e);
                None
            }
        }
    }
}

impl ConfigStore for MemoryStore {
    fn load(&self) -> Result<Option<Configuration>, PersistenceError> {
        Ok(self.saved())
    }

    fn save(&self, config: &Configuration) -> Result<(), PersistenceError> {
        let mut guard = self
            .saved
            .lock()
            .map_err(|e| PersistenceError::WorkerUnavailable(e.to_string()))?;
        *guard = Some(config.clone());
        Ok(())
    }
}

/// Synchronous TOML file store
#[derive(Debug, Clone)]
pub struct TomlFileStore {
    path: PathBuf,
}

impl TomlFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for TomlFileStore {
    fn load(&self) -> Result<Option<Configuration>, PersistenceError> {
        if !self.path.try_exists()? {
            debug!("No saved configuration at {}", self.path.display());
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let config = toml::from_str(&content)?;
        info!("Loaded configuration from {}", self.path.display());
        Ok(Some(config))
    }

    fn save(&self, config: &Configuration) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(config)?;
        std::fs::write(&self.path, content)?;
        debug!("Configuration saved to {}", self.path.display());
        Ok(())
    }
}

/// `~/.config/virtualpad/config.toml`, relative to the working directory if there is no home
pub fn default_config_path() -> PathBuf {
    let mut path = dirs::home_dir().unwrap_or_else(|| {
        warn!("Could not determine home directory, using current directory");
        PathBuf::from(".")
    });
    path.push(CONFIG_DIR);
    path.push(CONFIG_FILE);
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{ControllerProfile, Sensitivity};

    #[test]
    fn test_memory_store_shares_state_between_clones() {
        let store = MemoryStore::new();
        let observer = store.clone();
        assert!(store.load().expect("load").is_none());

        let mut config = Configuration::default();
        config.enabled = true;
        store.save(&config).expect("save");
        assert_eq!(observer.saved(), Some(config));
    }

    #[test]
    fn test_file_store_missing_file_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = TomlFileStore::new(dir.path().join("absent.toml"));
        assert!(store.load().expect("load").is_none());
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = TomlFileStore::new(dir.path().join("nested/config.toml"));

        let mut config = Configuration::default();
        config.controller_type = ControllerProfile::Ps4;
        config.sensitivity = Sensitivity::new(0.9);
        store.save(&config).expect("save");

        assert_eq!(store.load().expect("load"), Some(config));
    }

    #[test]
    fn test_file_store_reports_corrupt_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "enabled = [[[").expect("write");
        let store = TomlFileStore::new(path);
        assert!(matches!(store.load(), Err(PersistenceError::Parse(_))));
    }

    #[test]
    fn test_file_store_partial_file_merges_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "controllerType = \"ps5\"\n").expect("write");
        let config = TomlFileStore::new(path)
            .load()
            .expect("load")
            .expect("config");
        assert_eq!(config.controller_type, ControllerProfile::Ps5);
        assert!(config.block_keyboard_inputs);
        assert_eq!(config.key_mappings.len(), 27);
    }

    #[test]
    fn test_default_path_ends_with_config_file() {
        let path = default_config_path();
        assert!(path.ends_with(".config/virtualpad/config.toml"));
    }
}
