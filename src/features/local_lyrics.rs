//! Lyrics discovery for local audio files
//!
//! Finds lyrics next to the audio file or embedded in its metadata.

use std::fs;
use std::path::{Path, PathBuf};

use lofty::file::TaggedFileExt;
use lofty::probe::Probe;
use lofty::tag::ItemKey;

use super::lyrics::parse_lrc;
use crate::api::service::LyricsPayload;
use crate::encoding::decode_lyrics;

/// Supported lyrics file extensions
const LYRICS_EXTENSIONS: &[&str] = &[
    "lrc", // Standard LRC
    "txt", // Plain text or LRC saved as .txt
];

/// Find lyrics for an audio file
///
/// Priority:
/// 1. Same-name lyrics file (.lrc, .txt)
/// 2. Embedded lyrics (USLT tag)
pub fn find_local_lyrics(audio_path: &Path) -> Option<LyricsPayload> {
    if let Some(lyrics_path) = find_lyrics_file(audio_path) {
        match fs::read(&lyrics_path) {
            Ok(bytes) => {
                let payload = classify_lyrics_text(&decode_lyrics(&bytes));
                if !payload.is_empty() {
                    tracing::debug!("Loaded lyrics from {:?}", lyrics_path);
                    return Some(payload);
                }
            }
            Err(e) => tracing::warn!("Failed to read lyrics file {:?}: {}", lyrics_path, e),
        }
    }

    let embedded = extract_embedded_lyrics(audio_path)?;
    let payload = classify_lyrics_text(&embedded);
    if payload.is_empty() {
        return None;
    }
    tracing::debug!("Loaded embedded lyrics from {:?}", audio_path);
    Some(payload)
}

/// Synced if the text has at least one LRC timestamp, plain otherwise
pub fn classify_lyrics_text(text: &str) -> LyricsPayload {
    if text.trim().is_empty() {
        return LyricsPayload::default();
    }
    if parse_lrc(text).is_empty() {
        LyricsPayload::plain(text)
    } else {
        LyricsPayload::synced(text)
    }
}

/// Find lyrics file with same name as audio file
fn find_lyrics_file(audio_path: &Path) -> Option<PathBuf> {
    let parent = audio_path.parent()?;
    let stem = audio_path.file_stem()?.to_str()?;

    for ext in LYRICS_EXTENSIONS {
        let path = parent.join(format!("{}.{}", stem, ext));
        if path.is_file() {
            return Some(path);
        }

        let path = parent.join(format!("{}.{}", stem, ext.to_uppercase()));
        if path.is_file() {
            return Some(path);
        }
    }

    None
}

/// Extract embedded lyrics from audio file
fn extract_embedded_lyrics(audio_path: &Path) -> Option<String> {
    if !audio_path.is_file() {
        return None;
    }
    let tagged_file = Probe::open(audio_path).ok()?.read().ok()?;

    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())?;

    tag.get_string(&ItemKey::Lyrics)
        .filter(|lyrics| !lyrics.trim().is_empty())
        .map(str::to_string)
}
