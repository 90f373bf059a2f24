//! Engine settings persistence
//!
//! Handles saving and loading the tunables of the lyrics engine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::lyrics::coordinator::{AcquisitionConfig, AcquisitionStrategy};
use super::lyrics::positioner::ScrollConfig;

/// Lyrics engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricsSettings {
    /// How lyrics are acquired
    #[serde(default)]
    pub acquisition: AcquisitionSettings,
    /// Auto-scroll behaviour
    #[serde(default)]
    pub scroll: ScrollSettings,
    /// LRCLIB endpoint
    #[serde(default)]
    pub lrclib: LrclibSettings,
    /// Split `original / romaji` lines delivered pre-merged by a server
    #[serde(default = "default_true")]
    pub split_merged_romanization: bool,
}

/// Acquisition-related settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionSettings {
    #[serde(default)]
    pub strategy: AcquisitionStrategy,
    /// Delay between cache polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Cache polls before giving up
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
}

/// Scrolling-related settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollSettings {
    /// How long a manual scroll suspends auto-scrolling
    #[serde(default = "default_manual_scroll_timeout_ms")]
    pub manual_scroll_timeout_ms: u64,
}

/// LRCLIB client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LrclibSettings {
    #[serde(default = "default_lrclib_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_max_poll_attempts() -> u32 {
    20
}

fn default_manual_scroll_timeout_ms() -> u64 {
    5000
}

fn default_lrclib_base_url() -> String {
    "https://lrclib.net".to_string()
}

fn default_user_agent() -> String {
    concat!("lyricsync/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_timeout_secs() -> u64 {
    5
}

impl Default for LyricsSettings {
    fn default() -> Self {
        Self {
            acquisition: AcquisitionSettings::default(),
            scroll: ScrollSettings::default(),
            lrclib: LrclibSettings::default(),
            split_merged_romanization: true,
        }
    }
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            strategy: AcquisitionStrategy::default(),
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_attempts: default_max_poll_attempts(),
        }
    }
}

impl Default for ScrollSettings {
    fn default() -> Self {
        Self {
            manual_scroll_timeout_ms: default_manual_scroll_timeout_ms(),
        }
    }
}

impl Default for LrclibSettings {
    fn default() -> Self {
        Self {
            base_url: default_lrclib_base_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LyricsSettings {
    /// Get the settings file path
    pub fn file_path() -> Option<PathBuf> {
        crate::utils::config_dir().map(|dir| dir.join("settings.json"))
    }

    /// Load settings from file, or return defaults if not found
    pub fn load() -> Self {
        Self::file_path()
            .and_then(|path| Self::load_from_file(&path).ok())
            .unwrap_or_default()
    }

    /// Load settings from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| SettingsError::Io(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| SettingsError::Parse(e.to_string()))
    }

    /// Save settings to the default file
    pub fn save(&self) -> Result<(), SettingsError> {
        if let Some(path) = Self::file_path() {
            self.save_to_file(&path)
        } else {
            Err(SettingsError::Io(
                "Could not determine config directory".to_string(),
            ))
        }
    }

    /// Save settings to a specific file
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::Io(e.to_string()))?;
        }

        let content =
            serde_json::to_string_pretty(self).map_err(|e| SettingsError::Parse(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| SettingsError::Io(e.to_string()))?;
        Ok(())
    }

    /// Runtime acquisition parameters
    pub fn acquisition_config(&self) -> AcquisitionConfig {
        AcquisitionConfig {
            strategy: self.acquisition.strategy,
            poll_interval: Duration::from_millis(self.acquisition.poll_interval_ms),
            max_poll_attempts: self.acquisition.max_poll_attempts.max(1),
            split_merged_romanization: self.split_merged_romanization,
        }
    }

    /// Runtime scroll parameters
    pub fn scroll_config(&self) -> ScrollConfig {
        ScrollConfig {
            manual_scroll_timeout: Duration::from_millis(self.scroll.manual_scroll_timeout_ms),
        }
    }
}

/// Errors that can occur with settings
#[derive(Debug, Clone)]
pub enum SettingsError {
    Io(String),
    Parse(String),
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io(e) => write!(f, "IO error: {}", e),
            SettingsError::Parse(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for SettingsError {}
