//! Feature modules - lyrics engine logic and its persistence
//!
//! Each feature module contains the core logic for a specific functionality.
//! Nothing here paints pixels or decodes audio.

pub mod import;
pub mod local_lyrics;
pub mod lyrics;
pub mod preferences;
pub mod settings;

pub use preferences::{JsonPreferenceStore, MemoryPreferenceStore, PreferenceStore};
pub use settings::{LyricsSettings, SettingsError};
