//! Standard LRC format parser
//!
//! Supports the common `[mm:ss.xx]text` format with line-level synchronization.
//! Anything that does not match the tag grammar is ignored, never rejected.

use once_cell::sync::Lazy;
use regex::Regex;

use super::enrichment::has_japanese;
use super::types::LyricsLine;

/// `[mm:ss.xx]` or `[mm:ss.xxx]` at the start of the remaining input
static TIME_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[(\d{2}):(\d{2})\.(\d{2,3})\]").expect("valid LRC tag pattern"));

/// Separator used by servers that merge romanization into the line text
const MERGED_SEPARATOR: &str = " / ";

/// Parse a leading timestamp tag.
///
/// Returns the number of bytes consumed and the time in seconds.
fn parse_time(src: &str) -> Option<(usize, f64)> {
    let caps = TIME_TAG.captures(src)?;
    let min: u64 = caps[1].parse().ok()?;
    let sec: u64 = caps[2].parse().ok()?;

    // Two digits are hundredths: right-pad to milliseconds
    let frac = &caps[3];
    let ms: u64 = if frac.len() == 2 {
        frac.parse::<u64>().ok()? * 10
    } else {
        frac.parse().ok()?
    };

    let consumed = caps.get(0)?.end();
    let total_ms = min * 60_000 + sec * 1000 + ms;
    Some((consumed, total_ms as f64 / 1000.0))
}

/// Parse a single LRC line, which may have multiple timestamps
fn parse_line(line: &str) -> Vec<LyricsLine> {
    let line = line.trim();
    let mut timestamps = Vec::new();
    let mut pos = 0;

    while let Some((consumed, time)) = parse_time(&line[pos..]) {
        timestamps.push(time);
        pos += consumed;
    }

    let text = line[pos..].trim();
    if timestamps.is_empty() || text.is_empty() {
        return Vec::new();
    }

    timestamps
        .into_iter()
        .map(|time| LyricsLine::new(time, text))
        .collect()
}

/// Parse LRC content into time-ordered lyric lines.
///
/// Lines with identical timestamps keep their input order.
pub fn parse_lrc(src: &str) -> Vec<LyricsLine> {
    let mut result: Vec<LyricsLine> = src.lines().flat_map(parse_line).collect();

    // `sort_by` is stable, ties keep file order
    result.sort_by(|a, b| a.time.total_cmp(&b.time));
    result
}

/// Split lines of the form `original / romaji` into text and romanized text.
///
/// Only Japanese text followed by a non-Japanese half counts as merged;
/// everything else (`Love / Hate`) keeps its text. Lines that already carry
/// romanization are left alone.
pub fn split_merged_romanization(lines: &mut [LyricsLine]) {
    for line in lines.iter_mut().filter(|l| l.romanized_text.is_none()) {
        let Some((original, romanized)) = line.text.rsplit_once(MERGED_SEPARATOR) else {
            continue;
        };
        let (original, romanized) = (original.trim(), romanized.trim());
        if original.is_empty() || romanized.is_empty() {
            continue;
        }
        if !has_japanese(original) || has_japanese(romanized) {
            continue;
        }
        let romanized = romanized.to_string();
        line.text = original.to_string();
        line.romanized_text = Some(romanized);
    }
}

/// Write timestamp in LRC format
pub fn write_timestamp(result: &mut String, time_ms: u64) {
    use std::fmt::Write;
    let ms = time_ms % 1000;
    let sec = (time_ms / 1000) % 60;
    let min = time_ms / 60000;
    let _ = write!(result, "[{:02}:{:02}.{:03}]", min, sec, ms);
}

/// Convert lyrics back to LRC text
pub fn stringify_lrc(lines: &[LyricsLine]) -> String {
    let capacity: usize = lines.iter().map(|x| x.text.len() + 12).sum();
    let mut result = String::with_capacity(capacity);

    for line in lines {
        write_timestamp(&mut result, line.time_ms());
        result.push_str(&line.text);
        result.push('\n');
    }

    result
}
