//! Lyrics service boundary
//!
//! The engine never talks to the network or disk directly. It asks a
//! [`LyricsService`] either to fetch lyrics for a track, or whether a cache
//! that is populated out-of-band has an answer yet.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::features::lyrics::{TrackKey, TrackQuery};

/// Raw lyrics as delivered by a service
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricsPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plain_text: Option<String>,
    #[serde(default)]
    pub instrumental: bool,
}

impl LyricsPayload {
    pub fn synced(text: impl Into<String>) -> Self {
        Self {
            synced_text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            plain_text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn instrumental() -> Self {
        Self {
            instrumental: true,
            ..Default::default()
        }
    }

    /// Synced text, if present and not blank
    pub fn synced_text(&self) -> Option<&str> {
        self.synced_text.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// Plain text, if present and not blank
    pub fn plain_text(&self) -> Option<&str> {
        self.plain_text.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// No text and not flagged instrumental
    pub fn is_empty(&self) -> bool {
        self.synced_text().is_none() && self.plain_text().is_none() && !self.instrumental
    }
}

/// Answer to "is this track's lyrics ready yet"
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CachePoll {
    pub payload: LyricsPayload,
    /// Population is still in progress; ask again later
    pub still_fetching: bool,
}

impl CachePoll {
    pub fn ready(payload: LyricsPayload) -> Self {
        Self {
            payload,
            still_fetching: false,
        }
    }

    pub fn fetching() -> Self {
        Self {
            payload: LyricsPayload::default(),
            still_fetching: true,
        }
    }
}

type ProgressFn = dyn Fn(&str) + Send + Sync;

/// Side channel for human-readable status while a fetch is running
#[derive(Clone, Default)]
pub struct ProgressReporter {
    sink: Option<Arc<ProgressFn>>,
}

impl ProgressReporter {
    pub fn new(sink: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self {
            sink: Some(Arc::new(sink)),
        }
    }

    /// A reporter that drops every message
    pub fn noop() -> Self {
        Self::default()
    }

    pub fn report(&self, status: &str) {
        if let Some(sink) = &self.sink {
            sink(status);
        }
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("sink", &self.sink.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Source of lyrics for the acquisition coordinator
#[async_trait]
pub trait LyricsService: Send + Sync {
    /// Look up lyrics with a single request
    async fn fetch(
        &self,
        query: &TrackQuery,
        progress: &ProgressReporter,
    ) -> Result<LyricsPayload, ServiceError>;

    /// Check a cache that is populated out-of-band
    async fn poll_cache(&self, key: &TrackKey) -> Result<CachePoll, ServiceError>;
}

#[async_trait]
impl<S: LyricsService + ?Sized> LyricsService for Arc<S> {
    async fn fetch(
        &self,
        query: &TrackQuery,
        progress: &ProgressReporter,
    ) -> Result<LyricsPayload, ServiceError> {
        (**self).fetch(query, progress).await
    }

    async fn poll_cache(&self, key: &TrackKey) -> Result<CachePoll, ServiceError> {
        (**self).poll_cache(key).await
    }
}
