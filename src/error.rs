//! Error types for the lyrics engine.
//!
//! Service and enrichment failures get their own `thiserror` enums so the
//! coordinator can tell "no lyrics" apart from real failures. Application
//! glue (the binary, file import) uses `anyhow`.

/// Failure reported by a lyrics service
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// The service knows the track has no lyrics
    #[error("No lyrics found")]
    NotFound,

    /// Nothing is cached for the track and nothing is being fetched
    #[error("Lyrics not cached")]
    NotCached,

    /// Transport-level failure
    #[error("Failed to fetch lyrics: {0}")]
    Http(String),

    /// Unexpected HTTP status
    #[error("Lyrics service error: HTTP {0}")]
    Status(u16),

    /// Response body could not be decoded
    #[error("Failed to parse lyrics response: {0}")]
    Decode(String),

    /// Local cache or file failure
    #[error("Lyrics cache error: {0}")]
    Io(String),
}

impl ServiceError {
    /// Whether the error means "there are no lyrics" rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound | Self::NotCached)
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Http(e.to_string())
        }
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Failure of the romanization pass
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnrichmentError {
    #[error("Romanization failed: {0}")]
    Romanize(String),

    #[error("Romanization service unavailable: {0}")]
    Unavailable(String),
}
