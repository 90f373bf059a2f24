//! Utility functions

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

// ============================================================================
// Time & Path Utilities
// ============================================================================

/// Current time as unix seconds
pub fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Get the base cache directory for lyricsync
pub fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lyricsync")
}

/// Get the lyrics cache directory
pub fn lyrics_cache_dir() -> PathBuf {
    cache_dir().join("lyrics")
}

/// Get the config directory (settings and preferences)
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "lyricsync", "lyricsync")
        .map(|dirs| dirs.config_dir().to_path_buf())
}
