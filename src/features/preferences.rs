//! Key-value preference storage
//!
//! A flat string map persisted as JSON. Used for the handful of UI choices
//! that must survive restarts, such as the lyrics display mode.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::settings::SettingsError;

/// String-valued preference storage
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), SettingsError>;
}

/// Preferences kept in memory only
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Preferences backed by a JSON file, rewritten on every change
#[derive(Debug)]
pub struct JsonPreferenceStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl JsonPreferenceStore {
    /// Get the default preferences file path
    pub fn file_path() -> Option<PathBuf> {
        crate::utils::config_dir().map(|dir| dir.join("preferences.json"))
    }

    /// Open the store at `path`, starting empty if the file is missing or unreadable
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match Self::read(&path) {
            Ok(values) => values,
            Err(e) => {
                if path.exists() {
                    tracing::warn!("Ignoring unreadable preferences {:?}: {}", path, e);
                }
                BTreeMap::new()
            }
        };
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    fn read(path: &Path) -> Result<BTreeMap<String, String>, SettingsError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| SettingsError::Io(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| SettingsError::Parse(e.to_string()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for JsonPreferenceStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        let mut values = self.values.lock();
        values.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::Io(e.to_string()))?;
        }
        let content = serde_json::to_string_pretty(&*values)
            .map_err(|e| SettingsError::Parse(e.to_string()))?;
        std::fs::write(&self.path, content).map_err(|e| SettingsError::Io(e.to_string()))
    }
}
