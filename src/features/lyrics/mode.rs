//! Lyrics presentation mode (original / romanized / both)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::types::LyricsLine;
use crate::features::preferences::PreferenceStore;

/// Preference key holding the current mode
pub const MODE_PREFERENCE_KEY: &str = "lyrics_mode";

/// Which text a lyric line shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LyricsMode {
    #[default]
    Original,
    Romanized,
    Both,
}

impl LyricsMode {
    /// Get the next mode in cycle order
    pub fn next(self) -> Self {
        match self {
            LyricsMode::Original => LyricsMode::Romanized,
            LyricsMode::Romanized => LyricsMode::Both,
            LyricsMode::Both => LyricsMode::Original,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LyricsMode::Original => "original",
            LyricsMode::Romanized => "romanized",
            LyricsMode::Both => "both",
        }
    }

    /// Read the persisted mode, defaulting to `Original` for missing or unknown values
    pub fn load(store: &dyn PreferenceStore) -> Self {
        match store.get(MODE_PREFERENCE_KEY) {
            Some(value) => value.parse().unwrap_or_else(|_| {
                tracing::warn!("Unknown lyrics mode {:?} in preferences", value);
                LyricsMode::default()
            }),
            None => LyricsMode::default(),
        }
    }

    /// Pick the text to draw for `line` in this mode.
    ///
    /// Lines without romanization fall back to their original text.
    pub fn render<'a>(&self, line: &'a LyricsLine) -> RenderedLine<'a> {
        let romanized = line
            .romanized_text
            .as_deref()
            .filter(|r| !r.trim().is_empty());

        match (self, romanized) {
            (LyricsMode::Romanized, Some(r)) => RenderedLine {
                primary: r,
                secondary: None,
            },
            (LyricsMode::Both, Some(r)) => RenderedLine {
                primary: &line.text,
                secondary: Some(r),
            },
            _ => RenderedLine {
                primary: &line.text,
                secondary: None,
            },
        }
    }
}

impl fmt::Display for LyricsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LyricsMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "original" => Ok(LyricsMode::Original),
            "romanized" => Ok(LyricsMode::Romanized),
            "both" => Ok(LyricsMode::Both),
            other => Err(format!("unknown lyrics mode: {other}")),
        }
    }
}

/// Text of one line as it should be drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderedLine<'a> {
    pub primary: &'a str,
    /// Smaller sub-line under the primary text
    pub secondary: Option<&'a str>,
}
