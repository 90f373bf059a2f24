//! Lyrics data types
//!
//! Shared between the parser, the acquisition coordinator and the
//! rendering-state helpers.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::mode::LyricsMode;

/// A single time-stamped lyric line
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricsLine {
    /// Start time in seconds
    pub time: f64,
    /// Original lyric text (never empty)
    pub text: String,
    /// Romanized/phonetic version of the text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub romanized_text: Option<String>,
}

impl LyricsLine {
    pub fn new(time: f64, text: impl Into<String>) -> Self {
        Self {
            time,
            text: text.into(),
            romanized_text: None,
        }
    }

    /// Start time in whole milliseconds
    pub fn time_ms(&self) -> u64 {
        (self.time.max(0.0) * 1000.0).round() as u64
    }
}

/// Identifies the track a lyrics result belongs to.
///
/// Usually the audio file path. Asynchronous completions compare their key
/// against the engine's current key and are dropped on mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackKey(Arc<str>);

impl TrackKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(Arc::from(key.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Interpret the key as a filesystem path
    pub fn as_path(&self) -> &Path {
        Path::new(&*self.0)
    }
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TrackKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&Path> for TrackKey {
    fn from(value: &Path) -> Self {
        Self::new(value.to_string_lossy().into_owned())
    }
}

/// Track metadata needed to look up lyrics
#[derive(Debug, Clone, PartialEq)]
pub struct TrackQuery {
    pub artist: String,
    pub title: String,
    pub duration_secs: u32,
    pub key: TrackKey,
}

impl TrackQuery {
    pub fn new(
        artist: impl Into<String>,
        title: impl Into<String>,
        duration_secs: u32,
        key: impl Into<TrackKey>,
    ) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
            duration_secs,
            key: key.into(),
        }
    }
}

/// Why an acquisition ended in an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionErrorKind {
    /// No lyrics exist for the track
    NotFound,
    /// The cache was never populated within the poll budget
    Timeout,
    /// Network or service failure
    Transport,
}

/// User-facing message for tracks without lyrics
pub const NO_LYRICS_FOUND: &str = "No lyrics found";

/// The current lyrics state of a track
#[derive(Debug, Clone, PartialEq)]
pub enum AcquisitionResult {
    Loading { status_text: String },
    Synced { lines: Arc<Vec<LyricsLine>> },
    Plain { text: String },
    Instrumental,
    Error {
        kind: AcquisitionErrorKind,
        message: String,
    },
}

impl AcquisitionResult {
    pub fn loading(status_text: impl Into<String>) -> Self {
        Self::Loading {
            status_text: status_text.into(),
        }
    }

    pub fn synced(lines: Vec<LyricsLine>) -> Self {
        Self::Synced {
            lines: Arc::new(lines),
        }
    }

    pub fn not_found() -> Self {
        Self::Error {
            kind: AcquisitionErrorKind::NotFound,
            message: NO_LYRICS_FOUND.to_string(),
        }
    }

    pub fn timed_out() -> Self {
        Self::Error {
            kind: AcquisitionErrorKind::Timeout,
            message: "timed out".to_string(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Error {
            kind: AcquisitionErrorKind::Transport,
            message: message.into(),
        }
    }

    /// Synced lines, or an empty slice for every other variant
    pub fn lines(&self) -> &[LyricsLine] {
        match self {
            Self::Synced { lines } => lines.as_slice(),
            _ => &[],
        }
    }

    /// Text a UI should show for non-synced states.
    ///
    /// Timeouts read the same as "not found"; transport errors pass through.
    pub fn display_message(&self) -> Option<&str> {
        match self {
            Self::Loading { status_text } => Some(status_text),
            Self::Instrumental => Some("Instrumental"),
            Self::Error {
                kind: AcquisitionErrorKind::NotFound | AcquisitionErrorKind::Timeout,
                ..
            } => Some(NO_LYRICS_FOUND),
            Self::Error { message, .. } => Some(message),
            Self::Synced { .. } | Self::Plain { .. } => None,
        }
    }
}

/// Progress of the background romanization pass
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EnrichmentStatus {
    #[default]
    Idle,
    Running,
    Done,
    Failed { message: String },
}

/// Process-wide lyrics state, owned by the coordinator
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineState {
    /// `None` until the first acquisition or after `clear_lyrics`
    pub result: Option<AcquisitionResult>,
    /// Track the result belongs to
    pub key: Option<TrackKey>,
    /// Bumped on every acquisition start; fences same-key reloads
    pub generation: u64,
    pub mode: LyricsMode,
    pub enrichment: EnrichmentStatus,
    /// Whether the lyrics UI is open
    pub visible: bool,
}

impl EngineState {
    /// Currently held synced lines (empty when none)
    pub fn lines(&self) -> &[LyricsLine] {
        self.result.as_ref().map(|r| r.lines()).unwrap_or(&[])
    }

    pub fn is_current(&self, key: &TrackKey, generation: u64) -> bool {
        self.key.as_ref() == Some(key) && self.generation == generation
    }
}
