//! Lyrics acquisition coordinator
//!
//! Owns the process-wide [`EngineState`] and is the only writer to it. Every
//! acquisition stamps the state with the track key and a fresh generation
//! number; asynchronous completions carry that pair back and are dropped if
//! the state has moved on in the meantime.
//!
//! Two strategies are supported:
//! - Direct: one request to the lyrics service, awaited to completion.
//! - Cache poll: the service cache is populated out-of-band, so it is polled
//!   on a fixed interval until it answers or the attempt budget runs out.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::enrichment::{Romanizer, romanize_lines};
use super::mode::{LyricsMode, MODE_PREFERENCE_KEY};
use super::parser::{parse_lrc, split_merged_romanization};
use super::types::{
    AcquisitionResult, EngineState, EnrichmentStatus, LyricsLine, TrackKey, TrackQuery,
};
use crate::api::service::{LyricsPayload, LyricsService, ProgressReporter};
use crate::error::{EnrichmentError, ServiceError};
use crate::features::preferences::{MemoryPreferenceStore, PreferenceStore};

const STATUS_FETCHING: &str = "Fetching lyrics…";
const STATUS_CHECKING_CACHE: &str = "Checking cache…";
const STATUS_WAITING: &str = "Waiting for background fetch…";

/// How lyrics are requested from the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionStrategy {
    /// Single request, single response
    #[default]
    Direct,
    /// Poll a cache that is filled in the background
    CachePoll,
}

/// Runtime acquisition parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquisitionConfig {
    pub strategy: AcquisitionStrategy,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    pub split_merged_romanization: bool,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            strategy: AcquisitionStrategy::Direct,
            poll_interval: Duration::from_millis(500),
            max_poll_attempts: 20,
            split_merged_romanization: true,
        }
    }
}

/// Identifies one acquisition; state writes are only applied while it is current
#[derive(Debug, Clone, PartialEq, Eq)]
struct Fence {
    key: TrackKey,
    generation: u64,
}

struct Inner {
    service: Arc<dyn LyricsService>,
    romanizer: Option<Arc<dyn Romanizer>>,
    preferences: Arc<dyn PreferenceStore>,
    config: AcquisitionConfig,
    state: watch::Sender<EngineState>,
}

impl Inner {
    /// Apply `f` if `fence` still names the current acquisition
    fn commit(&self, fence: &Fence, f: impl FnOnce(&mut EngineState)) -> bool {
        self.state.send_if_modified(|state| {
            if !state.is_current(&fence.key, fence.generation) {
                return false;
            }
            f(state);
            true
        })
    }

    fn set_status(&self, fence: &Fence, status: &str) {
        let applied = self.commit(fence, |state| {
            state.result = Some(AcquisitionResult::loading(status));
        });
        if !applied {
            debug!("Dropping stale lyrics status for {}", fence.key);
        }
    }
}

/// Builder for [`LyricsCoordinator`]
pub struct LyricsCoordinatorBuilder {
    service: Arc<dyn LyricsService>,
    romanizer: Option<Arc<dyn Romanizer>>,
    preferences: Arc<dyn PreferenceStore>,
    config: AcquisitionConfig,
}

impl LyricsCoordinatorBuilder {
    pub fn config(mut self, config: AcquisitionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn romanizer(mut self, romanizer: Arc<dyn Romanizer>) -> Self {
        self.romanizer = Some(romanizer);
        self
    }

    pub fn preferences(mut self, preferences: Arc<dyn PreferenceStore>) -> Self {
        self.preferences = preferences;
        self
    }

    /// Build the coordinator, reading the persisted display mode once
    pub fn build(self) -> LyricsCoordinator {
        let mode = LyricsMode::load(self.preferences.as_ref());
        let (state, _) = watch::channel(EngineState {
            mode,
            ..Default::default()
        });
        LyricsCoordinator {
            inner: Arc::new(Inner {
                service: self.service,
                romanizer: self.romanizer,
                preferences: self.preferences,
                config: self.config,
                state,
            }),
        }
    }
}

/// Single owner of the lyrics engine state.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct LyricsCoordinator {
    inner: Arc<Inner>,
}

impl LyricsCoordinator {
    pub fn builder(service: Arc<dyn LyricsService>) -> LyricsCoordinatorBuilder {
        LyricsCoordinatorBuilder {
            service,
            romanizer: None,
            preferences: Arc::new(MemoryPreferenceStore::default()),
            config: AcquisitionConfig::default(),
        }
    }

    /// Coordinator with default config, no romanizer and in-memory preferences
    pub fn new(service: Arc<dyn LyricsService>) -> Self {
        Self::builder(service).build()
    }

    /// Watch every state change
    pub fn subscribe(&self) -> watch::Receiver<EngineState> {
        self.inner.state.subscribe()
    }

    /// Clone of the current state
    pub fn snapshot(&self) -> EngineState {
        self.inner.state.borrow().clone()
    }

    pub fn mode(&self) -> LyricsMode {
        self.inner.state.borrow().mode
    }

    /// Change the display mode and persist it
    pub fn set_mode(&self, mode: LyricsMode) {
        self.inner.state.send_if_modified(|state| {
            let changed = state.mode != mode;
            state.mode = mode;
            changed
        });
        if let Err(e) = self.inner.preferences.set(MODE_PREFERENCE_KEY, mode.as_str()) {
            warn!("Failed to persist lyrics mode: {}", e);
        }
    }

    /// Advance original -> romanized -> both -> original
    pub fn cycle_mode(&self) -> LyricsMode {
        let mode = self.mode().next();
        self.set_mode(mode);
        mode
    }

    /// Show the lyrics UI
    pub fn open(&self) {
        self.inner.state.send_if_modified(|state| {
            let changed = !state.visible;
            state.visible = true;
            changed
        });
    }

    /// Hide the lyrics UI. Held lyrics are kept.
    pub fn close(&self) {
        self.inner.state.send_if_modified(|state| {
            let changed = state.visible;
            state.visible = false;
            changed
        });
    }

    /// Forget the held result and track key
    pub fn clear_lyrics(&self) {
        self.inner.state.send_modify(|state| {
            state.result = None;
            state.key = None;
            state.enrichment = EnrichmentStatus::Idle;
        });
    }

    /// Acquire lyrics for `query`.
    ///
    /// Returns immediately with the held result if the state already belongs
    /// to this track. Otherwise publishes `Loading` states while working and
    /// commits the final result if no newer acquisition started meanwhile.
    /// The returned value is what this call resolved to, committed or not.
    pub async fn acquire(&self, query: TrackQuery) -> AcquisitionResult {
        if let Some(held) = self.held_result(&query.key) {
            debug!("Lyrics for {} already held, skipping request", query.key);
            return held;
        }
        self.run(query).await
    }

    /// Discard whatever is held for `query` and acquire again.
    ///
    /// Used after local lyrics were imported for the track.
    pub async fn reload(&self, query: TrackQuery) -> AcquisitionResult {
        info!("Reloading lyrics for {}", query.key);
        self.run(query).await
    }

    /// Romanize `lines` and, if `key` is still current, publish the result.
    ///
    /// Returns the enriched lines either way.
    pub async fn enrich(
        &self,
        lines: &[LyricsLine],
        key: &TrackKey,
    ) -> Result<Vec<LyricsLine>, EnrichmentError> {
        let generation = {
            let state = self.inner.state.borrow();
            (state.key.as_ref() == Some(key)).then_some(state.generation)
        };
        let fence = generation.map(|generation| Fence {
            key: key.clone(),
            generation,
        });
        self.enrich_fenced(fence, lines).await
    }

    fn held_result(&self, key: &TrackKey) -> Option<AcquisitionResult> {
        let state = self.inner.state.borrow();
        if state.key.as_ref() == Some(key) {
            state.result.clone()
        } else {
            None
        }
    }

    /// Stamp the state with a new acquisition and return its fence
    fn begin(&self, key: &TrackKey, status: &str) -> Fence {
        let mut generation = 0;
        self.inner.state.send_modify(|state| {
            state.generation += 1;
            generation = state.generation;
            state.key = Some(key.clone());
            state.result = Some(AcquisitionResult::loading(status));
            state.enrichment = EnrichmentStatus::Idle;
        });
        Fence {
            key: key.clone(),
            generation,
        }
    }

    async fn run(&self, query: TrackQuery) -> AcquisitionResult {
        let config = self.inner.config;
        info!(
            "Acquiring lyrics for {} - {} ({:?})",
            query.artist, query.title, config.strategy
        );

        let (fence, result) = match config.strategy {
            AcquisitionStrategy::Direct => {
                let fence = self.begin(&query.key, STATUS_FETCHING);
                let result = self.fetch_direct(&fence, &query).await;
                (fence, result)
            }
            AcquisitionStrategy::CachePoll => {
                let fence = self.begin(&query.key, STATUS_CHECKING_CACHE);
                let result = self.poll_cache(&fence).await;
                (fence, result)
            }
        };

        let enrich_lines = match &result {
            AcquisitionResult::Synced { lines } if self.inner.romanizer.is_some() => {
                Some(lines.clone())
            }
            _ => None,
        };

        let committed = self.inner.commit(&fence, |state| {
            state.result = Some(result.clone());
            if enrich_lines.is_some() {
                state.enrichment = EnrichmentStatus::Running;
            }
        });

        if !committed {
            debug!("Dropping stale lyrics result for {}", fence.key);
            return result;
        }

        debug!("Lyrics for {} resolved: {}", fence.key, describe(&result));
        if let Some(lines) = enrich_lines {
            self.spawn_enrichment(fence, lines);
        }
        result
    }

    async fn fetch_direct(&self, fence: &Fence, query: &TrackQuery) -> AcquisitionResult {
        let progress = {
            let inner = self.inner.clone();
            let fence = fence.clone();
            ProgressReporter::new(move |status| inner.set_status(&fence, status))
        };

        match self.inner.service.fetch(query, &progress).await {
            Ok(payload) => self.normalize(payload),
            Err(e) => error_result(e),
        }
    }

    /// Poll exactly `max_poll_attempts` times at most, sleeping between attempts
    async fn poll_cache(&self, fence: &Fence) -> AcquisitionResult {
        let config = self.inner.config;
        let attempts = config.max_poll_attempts.max(1);

        for attempt in 1..=attempts {
            if attempt > 1 {
                self.inner.set_status(fence, STATUS_WAITING);
            }
            debug!("Lyrics cache poll {}/{} for {}", attempt, attempts, fence.key);

            match self.inner.service.poll_cache(&fence.key).await {
                Ok(poll) if poll.still_fetching => {}
                Ok(poll) => return self.normalize(poll.payload),
                Err(e) => return error_result(e),
            }

            if attempt < attempts {
                tokio::time::sleep(config.poll_interval).await;
            }
        }

        warn!(
            "Lyrics cache for {} not ready after {} attempts",
            fence.key, attempts
        );
        AcquisitionResult::timed_out()
    }

    /// Turn a service payload into a result, in priority order:
    /// synced, plain, instrumental, not found
    fn normalize(&self, payload: LyricsPayload) -> AcquisitionResult {
        if let Some(synced) = payload.synced_text() {
            let mut lines = parse_lrc(synced);
            if !lines.is_empty() {
                if self.inner.config.split_merged_romanization {
                    split_merged_romanization(&mut lines);
                }
                return AcquisitionResult::synced(lines);
            }
            debug!("Synced lyrics had no timestamps, showing as plain text");
            let text = payload.plain_text().unwrap_or(synced);
            return AcquisitionResult::Plain {
                text: text.to_string(),
            };
        }

        if let Some(plain) = payload.plain_text() {
            return AcquisitionResult::Plain {
                text: plain.to_string(),
            };
        }

        if payload.instrumental {
            return AcquisitionResult::Instrumental;
        }

        AcquisitionResult::not_found()
    }

    fn spawn_enrichment(&self, fence: Fence, lines: Arc<Vec<LyricsLine>>) {
        let this = self.clone();
        tokio::spawn(async move {
            // Failures are already recorded in the state
            let _ = this.enrich_fenced(Some(fence), &lines).await;
        });
    }

    async fn enrich_fenced(
        &self,
        fence: Option<Fence>,
        lines: &[LyricsLine],
    ) -> Result<Vec<LyricsLine>, EnrichmentError> {
        let Some(romanizer) = self.inner.romanizer.clone() else {
            return Err(EnrichmentError::Unavailable(
                "no romanizer configured".to_string(),
            ));
        };

        let outcome = romanize_lines(romanizer.as_ref(), lines).await;
        let Some(fence) = fence else {
            return outcome;
        };

        let applied = match &outcome {
            Ok(enriched) => {
                let enriched = Arc::new(enriched.clone());
                self.inner.commit(&fence, |state| {
                    state.result = Some(AcquisitionResult::Synced { lines: enriched });
                    state.enrichment = EnrichmentStatus::Done;
                })
            }
            Err(e) => {
                let message = e.to_string();
                self.inner.commit(&fence, |state| {
                    state.enrichment = EnrichmentStatus::Failed { message };
                })
            }
        };

        match (&outcome, applied) {
            (_, false) => debug!("Dropping stale romanization for {}", fence.key),
            (Ok(_), true) => info!("Romanized lyrics for {}", fence.key),
            (Err(e), true) => warn!("Romanization failed for {}: {}", fence.key, e),
        }
        outcome
    }
}

fn error_result(e: ServiceError) -> AcquisitionResult {
    if e.is_not_found() {
        AcquisitionResult::not_found()
    } else {
        warn!("Lyrics request failed: {}", e);
        AcquisitionResult::transport(e.to_string())
    }
}

fn describe(result: &AcquisitionResult) -> String {
    match result {
        AcquisitionResult::Loading { status_text } => format!("loading ({status_text})"),
        AcquisitionResult::Synced { lines } => format!("{} synced lines", lines.len()),
        AcquisitionResult::Plain { .. } => "plain text".to_string(),
        AcquisitionResult::Instrumental => "instrumental".to_string(),
        AcquisitionResult::Error { message, .. } => format!("error ({message})"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tokio::sync::Notify;

    use super::*;
    use crate::api::service::CachePoll;
    use crate::features::lyrics::types::AcquisitionErrorKind;

    /// Scripted service: per-key responses, optionally held until released
    #[derive(Default)]
    struct MockService {
        fetch_responses: Mutex<HashMap<String, Result<LyricsPayload, ServiceError>>>,
        gates: Mutex<HashMap<String, Arc<Notify>>>,
        polls: Mutex<HashMap<String, Vec<CachePoll>>>,
        fetch_calls: AtomicUsize,
        poll_calls: AtomicUsize,
        progress: Vec<&'static str>,
    }

    impl MockService {
        fn respond(self, key: &str, response: Result<LyricsPayload, ServiceError>) -> Self {
            self.fetch_responses.lock().insert(key.to_string(), response);
            self
        }

        fn gate(&self, key: &str) -> Arc<Notify> {
            let notify = Arc::new(Notify::new());
            self.gates.lock().insert(key.to_string(), notify.clone());
            notify
        }
    }

    #[async_trait]
    impl LyricsService for MockService {
        async fn fetch(
            &self,
            query: &TrackQuery,
            progress: &ProgressReporter,
        ) -> Result<LyricsPayload, ServiceError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            for status in &self.progress {
                progress.report(status);
            }
            let gate = self.gates.lock().get(query.key.as_str()).cloned();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            self.fetch_responses
                .lock()
                .get(query.key.as_str())
                .cloned()
                .unwrap_or(Err(ServiceError::NotFound))
        }

        async fn poll_cache(&self, key: &TrackKey) -> Result<CachePoll, ServiceError> {
            self.poll_calls.fetch_add(1, Ordering::SeqCst);
            let mut polls = self.polls.lock();
            match polls.get_mut(key.as_str()) {
                Some(queue) if queue.len() > 1 => Ok(queue.remove(0)),
                Some(queue) => queue.first().cloned().ok_or(ServiceError::NotCached),
                None => Err(ServiceError::NotCached),
            }
        }
    }

    /// Appends " (r)" to every line, optionally waiting for a release first
    #[derive(Default)]
    struct MockRomanizer {
        gate: Option<Arc<Notify>>,
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Romanizer for MockRomanizer {
        async fn romanize(&self, text: &str) -> Result<Option<String>, EnrichmentError> {
            if let Some(gate) = &self.gate {
                if self.calls.load(Ordering::SeqCst) == 0 {
                    gate.notified().await;
                }
            }
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(EnrichmentError::Romanize("boom".into()));
            }
            Ok(Some(format!("{text} (r)")))
        }
    }

    const LA_DA: &str = "[00:00.00]la\n[00:03.50]da\n";

    fn query(key: &str) -> TrackQuery {
        TrackQuery::new("Artist", "Title", 180, key)
    }

    fn cache_poll_config(attempts: u32) -> AcquisitionConfig {
        AcquisitionConfig {
            strategy: AcquisitionStrategy::CachePoll,
            max_poll_attempts: attempts,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_direct_synced() {
        let service = Arc::new(MockService::default().respond("a", Ok(LyricsPayload::synced(LA_DA))));
        let coordinator = LyricsCoordinator::new(service.clone());

        let result = coordinator.acquire(query("a")).await;
        assert_eq!(
            result,
            AcquisitionResult::synced(vec![LyricsLine::new(0.0, "la"), LyricsLine::new(3.5, "da")])
        );
        let state = coordinator.snapshot();
        assert_eq!(state.key, Some(TrackKey::from("a")));
        assert_eq!(state.result, Some(result));
        assert_eq!(state.enrichment, EnrichmentStatus::Idle);
    }

    #[tokio::test]
    async fn test_dedup_issues_no_second_request() {
        let service = Arc::new(MockService::default().respond("a", Ok(LyricsPayload::synced(LA_DA))));
        let coordinator = LyricsCoordinator::new(service.clone());

        let first = coordinator.acquire(query("a")).await;
        let second = coordinator.acquire(query("a")).await;
        assert_eq!(first, second);
        assert_eq!(service.fetch_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_negative_result_also_dedups() {
        let service = Arc::new(MockService::default());
        let coordinator = LyricsCoordinator::new(service.clone());

        assert_eq!(coordinator.acquire(query("a")).await, AcquisitionResult::not_found());
        assert_eq!(coordinator.acquire(query("a")).await, AcquisitionResult::not_found());
        assert_eq!(service.fetch_calls.load(Ordering::SeqCst), 1);

        // reload bypasses the guard
        coordinator.reload(query("a")).await;
        assert_eq!(service.fetch_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_instrumental_is_not_an_error() {
        let service = Arc::new(MockService::default().respond("a", Ok(LyricsPayload::instrumental())));
        let coordinator = LyricsCoordinator::new(service);

        assert_eq!(
            coordinator.acquire(query("a")).await,
            AcquisitionResult::Instrumental
        );
    }

    #[tokio::test]
    async fn test_normalization_priority() {
        let both = LyricsPayload {
            synced_text: Some(LA_DA.into()),
            plain_text: Some("la\nda".into()),
            instrumental: true,
        };
        let untimed = LyricsPayload {
            synced_text: Some("no tags here".into()),
            plain_text: None,
            instrumental: false,
        };
        let plain_and_instrumental = LyricsPayload {
            synced_text: None,
            plain_text: Some("words".into()),
            instrumental: true,
        };
        let service = Arc::new(
            MockService::default()
                .respond("both", Ok(both))
                .respond("untimed", Ok(untimed))
                .respond("plain", Ok(plain_and_instrumental))
                .respond("empty", Ok(LyricsPayload::default())),
        );
        let coordinator = LyricsCoordinator::new(service);

        assert!(matches!(
            coordinator.acquire(query("both")).await,
            AcquisitionResult::Synced { .. }
        ));
        assert_eq!(
            coordinator.acquire(query("untimed")).await,
            AcquisitionResult::Plain {
                text: "no tags here".into()
            }
        );
        assert_eq!(
            coordinator.acquire(query("plain")).await,
            AcquisitionResult::Plain {
                text: "words".into()
            }
        );
        assert_eq!(
            coordinator.acquire(query("empty")).await,
            AcquisitionResult::not_found()
        );
    }

    #[tokio::test]
    async fn test_errors() {
        let service = Arc::new(
            MockService::default()
                .respond("cached", Err(ServiceError::NotCached))
                .respond("down", Err(ServiceError::Status(503))),
        );
        let coordinator = LyricsCoordinator::new(service);

        let result = coordinator.acquire(query("cached")).await;
        assert_eq!(result.display_message(), Some("No lyrics found"));

        let result = coordinator.acquire(query("down")).await;
        assert_eq!(
            result,
            AcquisitionResult::Error {
                kind: AcquisitionErrorKind::Transport,
                message: "Lyrics service error: HTTP 503".into()
            }
        );
    }

    #[tokio::test]
    async fn test_progress_is_published() {
        let mut service = MockService::default().respond("a", Ok(LyricsPayload::plain("x")));
        service.progress = vec!["Searching LRCLIB…"];
        let gate = service.gate("a");
        let service = Arc::new(service);
        let coordinator = LyricsCoordinator::new(service);
        let mut rx = coordinator.subscribe();

        let task = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.acquire(query("a")).await }
        });

        let state = rx
            .wait_for(|s| s.result == Some(AcquisitionResult::loading("Searching LRCLIB…")))
            .await
            .unwrap()
            .clone();
        assert_eq!(state.key, Some(TrackKey::from("a")));

        gate.notify_one();
        task.await.unwrap();
        assert_eq!(
            coordinator.snapshot().result,
            Some(AcquisitionResult::Plain { text: "x".into() })
        );
    }

    #[tokio::test]
    async fn test_overlapping_acquisitions_keep_latest() {
        let service = MockService::default()
            .respond("a", Ok(LyricsPayload::plain("from a")))
            .respond("b", Ok(LyricsPayload::plain("from b")));
        let gate_a = service.gate("a");
        let service = Arc::new(service);
        let coordinator = LyricsCoordinator::new(service.clone());
        let mut rx = coordinator.subscribe();

        let first = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.acquire(query("a")).await }
        });
        rx.wait_for(|s| s.key == Some(TrackKey::from("a")))
            .await
            .unwrap();

        let second = coordinator.acquire(query("b")).await;
        assert_eq!(second, AcquisitionResult::Plain { text: "from b".into() });

        gate_a.notify_one();
        let stale = first.await.unwrap();
        assert_eq!(stale, AcquisitionResult::Plain { text: "from a".into() });

        let state = coordinator.snapshot();
        assert_eq!(state.key, Some(TrackKey::from("b")));
        assert_eq!(state.result, Some(second));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_gives_up_after_budget() {
        let service = Arc::new(MockService::default());
        service
            .polls
            .lock()
            .insert("a".into(), vec![CachePoll::fetching()]);
        let coordinator = LyricsCoordinator::builder(service.clone())
            .config(cache_poll_config(20))
            .build();

        let started = tokio::time::Instant::now();
        let result = coordinator.acquire(query("a")).await;

        assert_eq!(result, AcquisitionResult::timed_out());
        assert_eq!(result.display_message(), Some("No lyrics found"));
        assert_eq!(service.poll_calls.load(Ordering::SeqCst), 20);
        assert_eq!(service.fetch_calls.load(Ordering::SeqCst), 0);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(19 * 500));
        assert!(elapsed < Duration::from_millis(20 * 500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_ready() {
        let service = Arc::new(MockService::default());
        service.polls.lock().insert(
            "a".into(),
            vec![
                CachePoll::fetching(),
                CachePoll::fetching(),
                CachePoll::ready(LyricsPayload::synced(LA_DA)),
            ],
        );
        let coordinator = LyricsCoordinator::builder(service.clone())
            .config(cache_poll_config(20))
            .build();

        let result = coordinator.acquire(query("a")).await;
        assert_eq!(result.lines().len(), 2);
        assert_eq!(service.poll_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_not_cached() {
        let service = Arc::new(MockService::default());
        let coordinator = LyricsCoordinator::builder(service.clone())
            .config(cache_poll_config(20))
            .build();

        assert_eq!(
            coordinator.acquire(query("a")).await,
            AcquisitionResult::not_found()
        );
        assert_eq!(service.poll_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_poll_does_not_touch_new_track() {
        let service = Arc::new(MockService::default());
        service.polls.lock().insert(
            "a".into(),
            vec![
                CachePoll::fetching(),
                CachePoll::ready(LyricsPayload::plain("from a")),
            ],
        );
        service
            .polls
            .lock()
            .insert("b".into(), vec![CachePoll::ready(LyricsPayload::plain("from b"))]);
        let coordinator = LyricsCoordinator::builder(service.clone())
            .config(cache_poll_config(5))
            .build();
        let mut rx = coordinator.subscribe();

        let first = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.acquire(query("a")).await }
        });
        rx.wait_for(|s| s.key == Some(TrackKey::from("a")))
            .await
            .unwrap();

        // "b" starts while "a" sleeps between polls
        let second = coordinator.acquire(query("b")).await;
        assert_eq!(second, AcquisitionResult::Plain { text: "from b".into() });

        assert_eq!(
            first.await.unwrap(),
            AcquisitionResult::Plain { text: "from a".into() }
        );
        assert_eq!(service.poll_calls.load(Ordering::SeqCst), 3);
        let state = coordinator.snapshot();
        assert_eq!(state.key, Some(TrackKey::from("b")));
        assert_eq!(state.result, Some(second));
    }

    #[tokio::test]
    async fn test_enrichment_success() {
        let service = Arc::new(MockService::default().respond("a", Ok(LyricsPayload::synced(LA_DA))));
        let coordinator = LyricsCoordinator::builder(service)
            .romanizer(Arc::new(MockRomanizer::default()))
            .build();
        let mut rx = coordinator.subscribe();

        coordinator.acquire(query("a")).await;
        let state = rx
            .wait_for(|s| s.enrichment == EnrichmentStatus::Done)
            .await
            .unwrap()
            .clone();

        let lines = state.lines();
        assert_eq!(lines[0].text, "la");
        assert_eq!(lines[0].romanized_text.as_deref(), Some("la (r)"));
        assert_eq!(lines[1].romanized_text.as_deref(), Some("da (r)"));
    }

    #[tokio::test]
    async fn test_enrichment_failure_keeps_lines() {
        let service = Arc::new(MockService::default().respond("a", Ok(LyricsPayload::synced(LA_DA))));
        let coordinator = LyricsCoordinator::builder(service)
            .romanizer(Arc::new(MockRomanizer {
                fail: true,
                ..Default::default()
            }))
            .build();
        let mut rx = coordinator.subscribe();

        coordinator.acquire(query("a")).await;
        let state = rx
            .wait_for(|s| matches!(s.enrichment, EnrichmentStatus::Failed { .. }))
            .await
            .unwrap()
            .clone();

        assert_eq!(state.lines().len(), 2);
        assert!(state.lines().iter().all(|l| l.romanized_text.is_none()));
        assert_eq!(
            state.enrichment,
            EnrichmentStatus::Failed {
                message: "Romanization failed: boom".into()
            }
        );
    }

    #[tokio::test]
    async fn test_stale_enrichment_is_dropped() {
        let gate = Arc::new(Notify::new());
        let romanizer = Arc::new(MockRomanizer {
            gate: Some(gate.clone()),
            ..Default::default()
        });
        let service = Arc::new(
            MockService::default()
                .respond("a", Ok(LyricsPayload::synced(LA_DA)))
                .respond("b", Ok(LyricsPayload::plain("b"))),
        );
        let coordinator = LyricsCoordinator::builder(service)
            .romanizer(romanizer.clone())
            .build();

        coordinator.acquire(query("a")).await;
        assert_eq!(coordinator.snapshot().enrichment, EnrichmentStatus::Running);

        coordinator.acquire(query("b")).await;
        gate.notify_one();
        while romanizer.calls.load(Ordering::SeqCst) < 2 {
            tokio::task::yield_now().await;
        }
        tokio::task::yield_now().await;

        let state = coordinator.snapshot();
        assert_eq!(state.key, Some(TrackKey::from("b")));
        assert_eq!(state.result, Some(AcquisitionResult::Plain { text: "b".into() }));
        assert_eq!(state.enrichment, EnrichmentStatus::Idle);
    }

    #[tokio::test]
    async fn test_enrich_without_current_key_does_not_publish() {
        let service = Arc::new(MockService::default());
        let coordinator = LyricsCoordinator::builder(service)
            .romanizer(Arc::new(MockRomanizer::default()))
            .build();

        let lines = vec![LyricsLine::new(0.0, "la")];
        let out = coordinator.enrich(&lines, &TrackKey::from("x")).await.unwrap();
        assert_eq!(out[0].romanized_text.as_deref(), Some("la (r)"));
        assert_eq!(coordinator.snapshot().result, None);
    }

    #[tokio::test]
    async fn test_mode_persisted() {
        let prefs = Arc::new(MemoryPreferenceStore::default());
        prefs.set(MODE_PREFERENCE_KEY, "romanized").unwrap();
        let coordinator = LyricsCoordinator::builder(Arc::new(MockService::default()))
            .preferences(prefs.clone())
            .build();

        assert_eq!(coordinator.mode(), LyricsMode::Romanized);
        assert_eq!(coordinator.cycle_mode(), LyricsMode::Both);
        assert_eq!(prefs.get(MODE_PREFERENCE_KEY).as_deref(), Some("both"));
        coordinator.set_mode(LyricsMode::Original);
        assert_eq!(prefs.get(MODE_PREFERENCE_KEY).as_deref(), Some("original"));
    }

    #[tokio::test]
    async fn test_close_and_clear() {
        let service = Arc::new(MockService::default().respond("a", Ok(LyricsPayload::plain("x"))));
        let coordinator = LyricsCoordinator::new(service.clone());

        coordinator.open();
        coordinator.acquire(query("a")).await;
        coordinator.close();
        let state = coordinator.snapshot();
        assert!(!state.visible);
        assert!(state.result.is_some());

        coordinator.clear_lyrics();
        let state = coordinator.snapshot();
        assert_eq!(state.result, None);
        assert_eq!(state.key, None);

        coordinator.acquire(query("a")).await;
        assert_eq!(service.fetch_calls.load(Ordering::SeqCst), 2);
    }
}
