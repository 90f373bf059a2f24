//! Lyrics cache
//!
//! One JSON file per track, named by an xxh3 hash of the track key. An entry
//! is either a pending marker (a background fetch is running) or a ready
//! payload. Negative answers are cached as ready payloads without text.
//!
//! [`CachedLyricsService`] layers imported lyrics, local files and this cache
//! in front of an upstream service and provides the out-of-band population that the
//! cache-poll acquisition strategy waits on.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::api::service::{CachePoll, LyricsPayload, LyricsService, ProgressReporter};
use crate::error::ServiceError;
use crate::features::local_lyrics::find_local_lyrics;
use crate::features::lyrics::{TrackKey, TrackQuery};
use crate::utils::{lyrics_cache_dir, now_unix_secs};

/// Pending markers older than this are treated as abandoned
const DEFAULT_PENDING_TTL: Duration = Duration::from_secs(60);

/// On-disk record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
enum CacheRecord {
    Pending {
        key: String,
        started_at: u64,
    },
    Ready {
        key: String,
        stored_at: u64,
        /// Picked by the user; wins over sidecar and embedded lyrics
        #[serde(default)]
        imported: bool,
        payload: LyricsPayload,
    },
}

/// What the cache knows about a track
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEntry {
    Missing,
    Pending,
    Ready(LyricsPayload),
}

/// Information about a cached file
#[derive(Debug)]
struct CacheFile {
    path: PathBuf,
    size: u64,
    modified: SystemTime,
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total_bytes: u64,
    pub file_count: usize,
}

/// Result of a cache clear operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClearResult {
    pub files_deleted: usize,
    pub bytes_freed: u64,
    pub errors: usize,
}

/// Directory of cached lyrics
#[derive(Debug, Clone)]
pub struct LyricsCache {
    dir: PathBuf,
    pending_ttl: Duration,
}

impl LyricsCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            pending_ttl: DEFAULT_PENDING_TTL,
        }
    }

    /// Cache in the platform cache directory
    pub fn open_default() -> Self {
        Self::new(lyrics_cache_dir())
    }

    pub fn with_pending_ttl(mut self, ttl: Duration) -> Self {
        self.pending_ttl = ttl;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &TrackKey) -> PathBuf {
        self.dir
            .join(format!("{:016x}.json", xxh3_64(key.as_str().as_bytes())))
    }

    fn read_record(&self, key: &TrackKey) -> Option<CacheRecord> {
        let path = self.entry_path(key);
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Corrupt lyrics cache entry {:?}: {}", path, e);
                None
            }
        }
    }

    /// Look up a track. Unreadable entries and abandoned markers count as missing.
    pub fn lookup(&self, key: &TrackKey) -> CacheEntry {
        match self.read_record(key) {
            None => CacheEntry::Missing,
            Some(CacheRecord::Ready { payload, .. }) => CacheEntry::Ready(payload),
            Some(CacheRecord::Pending { started_at, .. }) => {
                let age = now_unix_secs().saturating_sub(started_at);
                if age > self.pending_ttl.as_secs() {
                    debug!("Ignoring abandoned pending marker for {}", key);
                    CacheEntry::Missing
                } else {
                    CacheEntry::Pending
                }
            }
        }
    }

    /// Lyrics the user imported for `key`, if any
    pub fn imported(&self, key: &TrackKey) -> Option<LyricsPayload> {
        match self.read_record(key)? {
            CacheRecord::Ready {
                imported: true,
                payload,
                ..
            } => Some(payload),
            _ => None,
        }
    }

    /// Record that a background fetch for `key` has started
    pub fn mark_pending(&self, key: &TrackKey) -> Result<(), ServiceError> {
        self.write(
            key,
            &CacheRecord::Pending {
                key: key.to_string(),
                started_at: now_unix_secs(),
            },
        )
    }

    /// Store a payload (possibly empty, meaning "no lyrics")
    pub fn store(&self, key: &TrackKey, payload: &LyricsPayload) -> Result<(), ServiceError> {
        self.write_ready(key, payload, false)
    }

    /// Store lyrics picked by the user for `key`
    pub fn store_imported(
        &self,
        key: &TrackKey,
        payload: &LyricsPayload,
    ) -> Result<(), ServiceError> {
        self.write_ready(key, payload, true)
    }

    fn write_ready(
        &self,
        key: &TrackKey,
        payload: &LyricsPayload,
        imported: bool,
    ) -> Result<(), ServiceError> {
        self.write(
            key,
            &CacheRecord::Ready {
                key: key.to_string(),
                stored_at: now_unix_secs(),
                imported,
                payload: payload.clone(),
            },
        )
    }

    /// Drop whatever is cached for `key`
    pub fn remove(&self, key: &TrackKey) -> Result<(), ServiceError> {
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write through a temp file so readers never see a partial entry
    fn write(&self, key: &TrackKey, record: &CacheRecord) -> Result<(), ServiceError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.entry_path(key);
        let tmp = path.with_extension("json.tmp");
        let content =
            serde_json::to_string(record).map_err(|e| ServiceError::Decode(e.to_string()))?;
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn collect_files(&self) -> Vec<CacheFile> {
        let mut files = Vec::new();

        let read_dir = match fs::read_dir(&self.dir) {
            Ok(rd) => rd,
            Err(_) => return files,
        };

        for entry in read_dir.flatten() {
            let path = entry.path();
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            files.push(CacheFile {
                path,
                size: metadata.len(),
                modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }

        files
    }

    /// Calculate cache statistics
    pub fn stats(&self) -> CacheStats {
        let files = self.collect_files();
        CacheStats {
            total_bytes: files.iter().map(|f| f.size).sum(),
            file_count: files.len(),
        }
    }

    /// Delete every cached entry
    pub fn clear(&self) -> ClearResult {
        let mut result = ClearResult::default();
        for file in self.collect_files() {
            remove_counted(&file, &mut result);
        }
        info!(
            "Lyrics cache cleared: {} files deleted, {} errors",
            result.files_deleted, result.errors
        );
        result
    }

    /// Delete oldest entries until the cache fits in `max_bytes`
    pub fn enforce_limit(&self, max_bytes: u64) -> ClearResult {
        let mut result = ClearResult::default();
        let mut files = self.collect_files();
        let current: u64 = files.iter().map(|f| f.size).sum();
        if current <= max_bytes {
            return result;
        }

        // Oldest first
        files.sort_by(|a, b| a.modified.cmp(&b.modified));
        let target_free = current - max_bytes;
        for file in files {
            if result.bytes_freed >= target_free {
                break;
            }
            remove_counted(&file, &mut result);
        }

        info!(
            "Lyrics cache cleanup: {} files deleted, {} bytes freed",
            result.files_deleted, result.bytes_freed
        );
        result
    }
}

fn remove_counted(file: &CacheFile, result: &mut ClearResult) {
    match fs::remove_file(&file.path) {
        Ok(()) => {
            result.files_deleted += 1;
            result.bytes_freed += file.size;
        }
        Err(e) => {
            warn!("Failed to delete cache file {:?}: {}", file.path, e);
            result.errors += 1;
        }
    }
}

/// Serves lyrics from local files and the cache before asking `upstream`
pub struct CachedLyricsService<S> {
    upstream: Arc<S>,
    cache: Arc<LyricsCache>,
}

impl<S> Clone for CachedLyricsService<S> {
    fn clone(&self) -> Self {
        Self {
            upstream: self.upstream.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<S: LyricsService + 'static> CachedLyricsService<S> {
    pub fn new(upstream: S, cache: LyricsCache) -> Self {
        Self {
            upstream: Arc::new(upstream),
            cache: Arc::new(cache),
        }
    }

    pub fn cache(&self) -> &LyricsCache {
        &self.cache
    }

    /// Start populating the cache for `query` in the background.
    ///
    /// Returns `None` when local lyrics exist or the cache already has (or is
    /// getting) an answer.
    pub fn prefetch(&self, query: &TrackQuery) -> Option<JoinHandle<()>> {
        if find_local_lyrics(query.key.as_path()).is_some() {
            return None;
        }
        if self.cache.lookup(&query.key) != CacheEntry::Missing {
            return None;
        }
        if let Err(e) = self.cache.mark_pending(&query.key) {
            warn!("Failed to mark lyrics prefetch for {}: {}", query.key, e);
            return None;
        }

        debug!("Prefetching lyrics for {}", query.key);
        let upstream = self.upstream.clone();
        let cache = self.cache.clone();
        let query = query.clone();
        Some(tokio::spawn(async move {
            let outcome = upstream.fetch(&query, &ProgressReporter::noop()).await;
            if store_outcome(&cache, &query.key, outcome).is_ok() {
                debug!("Prefetched lyrics for {}", query.key);
            }
        }))
    }
}

/// Cache a fetch outcome: payloads and "not found" are stored, failures clear the marker
fn store_outcome(
    cache: &LyricsCache,
    key: &TrackKey,
    outcome: Result<LyricsPayload, ServiceError>,
) -> Result<LyricsPayload, ServiceError> {
    let stored = match &outcome {
        Ok(payload) => cache.store(key, payload),
        Err(e) if e.is_not_found() => cache.store(key, &LyricsPayload::default()),
        Err(e) => {
            debug!("Not caching failed lyrics fetch for {}: {}", key, e);
            cache.remove(key)
        }
    };
    if let Err(e) = stored {
        warn!("Failed to update lyrics cache for {}: {}", key, e);
    }
    outcome
}

#[async_trait]
impl<S: LyricsService + 'static> LyricsService for CachedLyricsService<S> {
    async fn fetch(
        &self,
        query: &TrackQuery,
        progress: &ProgressReporter,
    ) -> Result<LyricsPayload, ServiceError> {
        if let Some(imported) = self.cache.imported(&query.key) {
            debug!("Using imported lyrics for {}", query.key);
            return Ok(imported);
        }
        if let Some(local) = find_local_lyrics(query.key.as_path()) {
            return Ok(local);
        }
        if let CacheEntry::Ready(payload) = self.cache.lookup(&query.key) {
            debug!("Lyrics cache hit for {}", query.key);
            return Ok(payload);
        }

        let outcome = self.upstream.fetch(query, progress).await;
        store_outcome(&self.cache, &query.key, outcome)
    }

    async fn poll_cache(&self, key: &TrackKey) -> Result<CachePoll, ServiceError> {
        if let Some(imported) = self.cache.imported(key) {
            return Ok(CachePoll::ready(imported));
        }
        if let Some(local) = find_local_lyrics(key.as_path()) {
            return Ok(CachePoll::ready(local));
        }
        match self.cache.lookup(key) {
            CacheEntry::Ready(payload) => Ok(CachePoll::ready(payload)),
            CacheEntry::Pending => Ok(CachePoll::fetching()),
            CacheEntry::Missing => Err(ServiceError::NotCached),
        }
    }
}
