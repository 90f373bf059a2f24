//! Active line lookup for the current playback position

use super::types::LyricsLine;

/// Find the line that is active at `position` (seconds).
///
/// Returns the largest index whose start time is `<= position`, or `None`
/// before the first line and for empty input. Scans backwards so that, among
/// lines sharing a timestamp, the later one wins. Cheap enough to call on
/// every frame for typical line counts.
pub fn resolve_active_index(lines: &[LyricsLine], position: f64) -> Option<usize> {
    lines.iter().rposition(|line| line.time <= position)
}
