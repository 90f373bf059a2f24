//! Encoding detection for imported lyrics files
//!
//! Lyrics files shipped with older CJK releases are often GBK, Big5 or
//! Shift-JIS rather than UTF-8. Decoding falls back through the common
//! legacy encodings before giving up with a lossy conversion.

use encoding_rs::{BIG5, EUC_JP, EUC_KR, GBK, SHIFT_JIS, UTF_16BE, UTF_16LE, WINDOWS_1252};

/// Decode lyrics file bytes
///
/// Detection priority:
/// 1. Byte order mark (UTF-8, UTF-16 LE/BE)
/// 2. UTF-8
/// 3. Shift-JIS, EUC-JP, GBK, Big5, EUC-KR
/// 4. Windows-1252
pub fn decode_lyrics(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    if bytes.starts_with(&[0xFF, 0xFE]) {
        return UTF_16LE.decode_with_bom_removal(bytes).0.into_owned();
    }
    if bytes.starts_with(&[0xFE, 0xFF]) {
        return UTF_16BE.decode_with_bom_removal(bytes).0.into_owned();
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Japanese first: romanization only helps kana lyrics
    let encodings = [SHIFT_JIS, EUC_JP, GBK, BIG5, EUC_KR];
    for encoding in encodings {
        let (decoded, _, had_errors) = encoding.decode(bytes);
        if !had_errors && is_likely_valid_text(&decoded) {
            tracing::debug!("Decoded lyrics file as {}", encoding.name());
            return decoded.into_owned();
        }
    }

    let (decoded, _, had_errors) = WINDOWS_1252.decode(bytes);
    if !had_errors {
        return decoded.into_owned();
    }

    String::from_utf8_lossy(bytes).into_owned()
}

/// Heuristic check if decoded text looks valid
fn is_likely_valid_text(s: &str) -> bool {
    if s.is_empty() {
        return true;
    }

    let suspicious_count = s
        .chars()
        .filter(|c| {
            (*c < ' ' && !matches!(c, '\t' | '\n' | '\r'))
                || ('\u{E000}'..='\u{F8FF}').contains(c)
                || *c == '\u{FFFD}'
        })
        .count();

    // Allow up to 5% suspicious characters
    let threshold = (s.len() / 20).max(1);
    suspicious_count <= threshold
}
