//! Romanization pass over synced lyrics
//!
//! Runs after a track resolves to synced lines. Only `romanized_text` is ever
//! written; the original text is left untouched.

use async_trait::async_trait;
use wana_kana::ConvertJapanese;

use super::types::LyricsLine;
use crate::error::EnrichmentError;

/// Produces a romanized/phonetic rendering of a lyric line
#[async_trait]
pub trait Romanizer: Send + Sync {
    /// `Ok(None)` means the text needs no romanization
    async fn romanize(&self, text: &str) -> Result<Option<String>, EnrichmentError>;
}

/// Hiragana, katakana or half-width katakana
fn is_kana(c: char) -> bool {
    matches!(c, '\u{3041}'..='\u{309F}' | '\u{30A0}'..='\u{30FF}' | '\u{FF66}'..='\u{FF9F}')
}

/// CJK ideographs (main block, extension A, compatibility) and the 々 mark
fn is_kanji(c: char) -> bool {
    matches!(
        c,
        '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' | '\u{F900}'..='\u{FAFF}' | '\u{3005}'
    )
}

/// Whether the text contains any kana
pub fn has_kana(text: &str) -> bool {
    text.chars().any(is_kana)
}

/// Whether the text contains any kanji
pub fn has_kanji(text: &str) -> bool {
    text.chars().any(is_kanji)
}

/// Whether the text contains kana or kanji
pub fn has_japanese(text: &str) -> bool {
    text.chars().any(|c| is_kana(c) || is_kanji(c))
}

/// Romanizes kana-only Japanese lines with `wana_kana`.
///
/// Kanji need a dictionary reading, so lines containing them are left
/// without a romanization instead of getting a half-converted one.
#[derive(Debug, Clone, Copy, Default)]
pub struct KanaRomanizer;

#[async_trait]
impl Romanizer for KanaRomanizer {
    async fn romanize(&self, text: &str) -> Result<Option<String>, EnrichmentError> {
        if !has_kana(text) || has_kanji(text) {
            return Ok(None);
        }
        let romaji = text.to_romaji();
        if romaji == text || romaji.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(romaji))
    }
}

/// Romanize every line that doesn't already carry a romanization.
///
/// Fails as a whole on the first romanizer error.
pub async fn romanize_lines(
    romanizer: &dyn Romanizer,
    lines: &[LyricsLine],
) -> Result<Vec<LyricsLine>, EnrichmentError> {
    let mut enriched = Vec::with_capacity(lines.len());
    for line in lines {
        let mut line = line.clone();
        if line.romanized_text.is_none() {
            line.romanized_text = romanizer.romanize(&line.text).await?;
        }
        enriched.push(line);
    }
    Ok(enriched)
}
