//! Last-known-good snapshot cache
//!
//! Persists the application snapshot at teardown and pre-seeds source states
//! at the next startup, so the dashboard shows something before the first
//! fetch completes. Strictly best-effort: a missing or corrupt cache file
//! just means starting from the unknown state.

use std::fs;
use std::path::PathBuf;

use crate::core::AppSnapshot;

/// On-disk cache for the last published [`AppSnapshot`]
pub struct SnapshotCache {
    path: PathBuf,
}

impl SnapshotCache {
    const FILENAME: &'static str = "snapshot-cache.json";

    /// Cache at an explicit path (tests point this at a temp dir)
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Cache at the platform data directory
    pub fn at_default_location() -> Option<Self> {
        dirs::data_local_dir().map(|d| Self::new(d.join("vvvwatch").join(Self::FILENAME)))
    }

    /// Load the cached snapshot. Absence or corruption yields `None`.
    pub fn load(&self) -> Option<AppSnapshot> {
        let data = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&data) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::debug!("snapshot cache unreadable, ignoring: {}", e);
                None
            }
        }
    }

    /// Save a snapshot to disk
    pub fn save(&self, snapshot: &AppSnapshot) -> Result<(), SnapshotCacheError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(snapshot)?;
        fs::write(&self.path, json)?;

        tracing::debug!("saved snapshot cache to {:?}", self.path);
        Ok(())
    }

    /// Remove the cache file
    pub fn clear(&self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Snapshot cache errors
#[derive(Debug, thiserror::Error)]
pub enum SnapshotCacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Aggregator, Freshness, PriceSnapshot, SourceId, SourcePayload};
    use chrono::{Duration as ChronoDuration, Utc};
    use std::time::Duration;

    fn cache_in(dir: &tempfile::TempDir) -> SnapshotCache {
        SnapshotCache::new(dir.path().join("snapshot-cache.json"))
    }

    #[test]
    fn test_round_trip_preserves_payload_and_age() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir);

        let agg = Aggregator::new(&[(SourceId::Price, Duration::from_secs(60))]);
        agg.apply(
            SourceId::Price,
            Ok(SourcePayload::Price(PriceSnapshot::single("usd", 100.0))),
        );
        let mut snapshot = agg.snapshot();
        // Pretend the value was captured long ago
        let old = Utc::now() - ChronoDuration::seconds(600);
        snapshot.states.get_mut(&SourceId::Price).unwrap().fetched_at = Some(old);

        cache.save(&snapshot).unwrap();
        let loaded = cache.load().unwrap();

        let state = loaded.state(SourceId::Price).unwrap();
        let price = state
            .payload
            .as_ref()
            .and_then(|p| p.as_price())
            .and_then(|p| p.price("usd"));
        assert_eq!(price, Some(100.0));
        assert_eq!(state.fetched_at, Some(old));
        // Age survives the round trip, so the entry classifies as stale
        assert_eq!(state.freshness(Utc::now()), Freshness::Stale);
    }

    #[test]
    fn test_missing_cache_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(cache_in(&dir).load().is_none());
    }

    #[test]
    fn test_corrupt_cache_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir);
        fs::write(dir.path().join("snapshot-cache.json"), "{not json").unwrap();
        assert!(cache.load().is_none());
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir);
        let agg = Aggregator::new(&[(SourceId::Price, Duration::from_secs(60))]);
        cache.save(&agg.snapshot()).unwrap();
        assert!(cache.load().is_some());

        cache.clear();
        assert!(cache.load().is_none());
    }
}
