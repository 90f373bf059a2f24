//! Local lyrics file import
//!
//! A user-picked lyrics file is decoded, stored in the lyrics cache for the
//! track and the coordinator is told to re-acquire, which replaces any
//! previously held (possibly negative) result.

use std::path::Path;

use anyhow::{Context, Result};

use super::local_lyrics::classify_lyrics_text;
use super::lyrics::{
    AcquisitionResult, LyricsCoordinator, TrackKey, TrackQuery, parse_lrc, stringify_lrc,
};
use crate::api::service::LyricsPayload;
use crate::cache::LyricsCache;
use crate::encoding::decode_lyrics;

/// Store the lyrics in `file` as the cached lyrics for `key`.
///
/// Timestamped files are normalized to `[mm:ss.mmm]` form; anything else is
/// stored as plain text.
pub fn import_lyrics_file(
    cache: &LyricsCache,
    file: &Path,
    key: &TrackKey,
) -> Result<LyricsPayload> {
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read lyrics file {:?}", file))?;
    let text = decode_lyrics(&bytes);

    let payload = match classify_lyrics_text(&text) {
        LyricsPayload {
            synced_text: Some(synced),
            ..
        } => LyricsPayload::synced(stringify_lrc(&parse_lrc(&synced))),
        payload if payload.is_empty() => anyhow::bail!("Lyrics file {:?} is empty", file),
        payload => payload,
    };

    cache
        .store_imported(key, &payload)
        .with_context(|| format!("Failed to cache imported lyrics for {}", key))?;
    tracing::info!("Imported lyrics from {:?} for {}", file, key);
    Ok(payload)
}

/// Import `file` for `query` and re-acquire, bypassing the held result
pub async fn import_and_reload(
    coordinator: &LyricsCoordinator,
    cache: &LyricsCache,
    file: &Path,
    query: TrackQuery,
) -> Result<AcquisitionResult> {
    import_lyrics_file(cache, file, &query.key)?;
    Ok(coordinator.reload(query).await)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::api::service::{CachePoll, LyricsService, ProgressReporter};
    use crate::cache::{CacheEntry, CachedLyricsService};
    use crate::error::ServiceError;
    use crate::features::lyrics::LyricsLine;

    struct NoLyrics;

    #[async_trait::async_trait]
    impl LyricsService for NoLyrics {
        async fn fetch(
            &self,
            _query: &TrackQuery,
            _progress: &ProgressReporter,
        ) -> Result<LyricsPayload, ServiceError> {
            Err(ServiceError::NotFound)
        }

        async fn poll_cache(&self, _key: &TrackKey) -> Result<CachePoll, ServiceError> {
            Err(ServiceError::NotCached)
        }
    }

    #[test]
    fn test_import_normalizes_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("pick.lrc");
        std::fs::write(&file, "[ar:someone]\n[00:03.5x]bad\n[00:01.20]one\n").unwrap();
        let cache = LyricsCache::new(dir.path().join("cache"));
        let key = TrackKey::from("/music/a.mp3");

        let payload = import_lyrics_file(&cache, &file, &key).unwrap();
        assert_eq!(payload, LyricsPayload::synced("[00:01.200]one\n"));
        assert_eq!(cache.lookup(&key), CacheEntry::Ready(payload.clone()));
        assert_eq!(cache.imported(&key), Some(payload));
    }

    #[test]
    fn test_import_empty_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("empty.lrc");
        std::fs::write(&file, "  \n").unwrap();
        let cache = LyricsCache::new(dir.path().join("cache"));

        assert!(import_lyrics_file(&cache, &file, &TrackKey::from("k")).is_err());
        let missing = dir.path().join("nope.lrc");
        assert!(import_lyrics_file(&cache, &missing, &TrackKey::from("k")).is_err());
    }

    #[tokio::test]
    async fn test_import_replaces_negative_result() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join("cache");
        let service = Arc::new(CachedLyricsService::new(NoLyrics, LyricsCache::new(&cache_dir)));
        let coordinator = LyricsCoordinator::new(service);
        let query = TrackQuery::new("A", "T", 100, dir.path().join("song.mp3").as_path());

        assert_eq!(
            coordinator.acquire(query.clone()).await,
            AcquisitionResult::not_found()
        );

        let file = dir.path().join("picked.lrc");
        std::fs::write(&file, "[00:00.50]found it\n").unwrap();
        let result = import_and_reload(&coordinator, &LyricsCache::new(&cache_dir), &file, query)
            .await
            .unwrap();

        assert_eq!(
            result,
            AcquisitionResult::synced(vec![LyricsLine::new(0.5, "found it")])
        );
        assert_eq!(coordinator.snapshot().result, Some(result));
    }

    #[tokio::test]
    async fn test_import_replaces_sidecar_lyrics() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join("cache");
        std::fs::write(dir.path().join("song.txt"), "old plain words").unwrap();
        let service = Arc::new(CachedLyricsService::new(NoLyrics, LyricsCache::new(&cache_dir)));
        let coordinator = LyricsCoordinator::new(service);
        let query = TrackQuery::new("A", "T", 100, dir.path().join("song.mp3").as_path());

        assert_eq!(
            coordinator.acquire(query.clone()).await,
            AcquisitionResult::Plain {
                text: "old plain words".to_string()
            }
        );

        let file = dir.path().join("picked.lrc");
        std::fs::write(&file, "[00:00.50]imported\n").unwrap();
        let result = import_and_reload(&coordinator, &LyricsCache::new(&cache_dir), &file, query)
            .await
            .unwrap();

        assert_eq!(
            result,
            AcquisitionResult::synced(vec![LyricsLine::new(0.5, "imported")])
        );
    }
}
