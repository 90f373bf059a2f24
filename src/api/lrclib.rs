//! LRCLIB client
//!
//! Fetches lyrics from the public LRCLIB API. An exact lookup by artist,
//! title and duration is tried first; if it fails, a broader search without
//! the duration is attempted.
//!
//! API: `GET {base}/api/get?artist_name=X&track_name=Y&duration=Z`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::service::{CachePoll, LyricsPayload, LyricsService, ProgressReporter};
use crate::error::ServiceError;
use crate::features::lyrics::{TrackKey, TrackQuery};
use crate::features::settings::LrclibSettings;

/// LRCLIB API response structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LrclibResponse {
    pub id: Option<i64>,
    pub track_name: Option<String>,
    pub artist_name: Option<String>,
    pub album_name: Option<String>,
    pub duration: Option<f64>,
    pub instrumental: Option<bool>,
    pub plain_lyrics: Option<String>,
    pub synced_lyrics: Option<String>,
}

impl From<LrclibResponse> for LyricsPayload {
    fn from(r: LrclibResponse) -> Self {
        Self {
            synced_text: r.synced_lyrics.filter(|s| !s.trim().is_empty()),
            plain_text: r.plain_lyrics.filter(|s| !s.trim().is_empty()),
            instrumental: r.instrumental.unwrap_or(false),
        }
    }
}

/// Pick the most useful search result: synced > plain > first
fn best_search_result(results: Vec<LrclibResponse>) -> Option<LrclibResponse> {
    let has_text = |s: &Option<String>| s.as_deref().is_some_and(|s| !s.trim().is_empty());

    if let Some(pos) = results.iter().position(|r| has_text(&r.synced_lyrics)) {
        return results.into_iter().nth(pos);
    }
    if let Some(pos) = results.iter().position(|r| has_text(&r.plain_lyrics)) {
        return results.into_iter().nth(pos);
    }
    results.into_iter().next()
}

/// HTTP client for LRCLIB
#[derive(Debug, Clone)]
pub struct LrclibClient {
    http: Client,
    base_url: String,
}

impl LrclibClient {
    pub fn new(settings: &LrclibSettings) -> Result<Self, ServiceError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.as_str())
            .build()?;
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn get_url(&self, query: &TrackQuery) -> String {
        format!(
            "{}/api/get?artist_name={}&track_name={}&duration={}",
            self.base_url,
            urlencoding::encode(&query.artist),
            urlencoding::encode(&query.title),
            query.duration_secs
        )
    }

    fn search_url(&self, query: &TrackQuery) -> String {
        format!(
            "{}/api/search?artist_name={}&track_name={}",
            self.base_url,
            urlencoding::encode(&query.artist),
            urlencoding::encode(&query.title)
        )
    }

    /// Exact lookup including the duration
    pub async fn get(&self, query: &TrackQuery) -> Result<LrclibResponse, ServiceError> {
        let url = self.get_url(query);
        debug!("LRCLIB request: {}", url);

        let response = self.http.get(&url).send().await?;
        match response.status() {
            status if status.is_success() => Ok(response.json().await?),
            StatusCode::NOT_FOUND => Err(ServiceError::NotFound),
            status => Err(ServiceError::Status(status.as_u16())),
        }
    }

    /// Search without duration (sometimes matches when the exact lookup fails)
    pub async fn search(&self, query: &TrackQuery) -> Result<LrclibResponse, ServiceError> {
        let url = self.search_url(query);
        debug!("LRCLIB search: {}", url);

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Status(status.as_u16()));
        }

        let results: Vec<LrclibResponse> = response.json().await?;
        best_search_result(results).ok_or(ServiceError::NotFound)
    }
}

#[async_trait]
impl LyricsService for LrclibClient {
    async fn fetch(
        &self,
        query: &TrackQuery,
        progress: &ProgressReporter,
    ) -> Result<LyricsPayload, ServiceError> {
        info!(
            "Fetching lyrics for: {} - {} ({}s)",
            query.artist, query.title, query.duration_secs
        );
        progress.report("Searching LRCLIB…");

        let response = match self.get(query).await {
            Ok(response) => response,
            Err(e) => {
                debug!("Exact LRCLIB lookup failed ({}), trying search", e);
                progress.report("Trying broader search…");
                self.search(query).await?
            }
        };

        let payload = LyricsPayload::from(response);
        if payload.synced_text().is_some() {
            debug!("Found synced lyrics");
        } else if payload.plain_text().is_some() {
            debug!("Found plain lyrics (no synced available)");
        } else if payload.instrumental {
            debug!("Track is instrumental");
        }
        Ok(payload)
    }

    async fn poll_cache(&self, _key: &TrackKey) -> Result<CachePoll, ServiceError> {
        Err(ServiceError::NotCached)
    }
}
