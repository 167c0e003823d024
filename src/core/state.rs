//! Per-source state, the application snapshot and the aggregator
//!
//! The aggregator is the single writer: fetch results from any worker are
//! merged under one lock and published to subscribers through a watch
//! channel. A failed fetch never clears the last good payload.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::watch;

use super::{FetchError, FetchResult, SourceId, SourcePayload};

/// How current a source's payload is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    /// No successful fetch yet; distinct from a real zero value
    Unknown,
    Fresh,
    Stale,
}

/// Most recent fetch failure for a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceError {
    pub kind: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl SourceError {
    fn from_fetch(e: &FetchError, at: DateTime<Utc>) -> Self {
        Self {
            kind: e.kind().to_string(),
            message: e.to_string(),
            at,
        }
    }
}

/// Last-known-good state of one data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceState {
    /// Last successful payload, kept across failures
    pub payload: Option<SourcePayload>,
    /// When the payload was captured
    pub fetched_at: Option<DateTime<Utc>>,
    /// Most recent error, cleared on success
    pub last_error: Option<SourceError>,
    /// Polling interval the freshness threshold derives from
    pub interval_secs: u64,
}

impl SourceState {
    pub fn new(interval: Duration) -> Self {
        Self {
            payload: None,
            fetched_at: None,
            last_error: None,
            interval_secs: interval.as_secs(),
        }
    }

    /// Payload age at `now`
    pub fn age(&self, now: DateTime<Utc>) -> Option<ChronoDuration> {
        self.fetched_at.map(|t| now - t)
    }

    /// Freshness at `now`. Stale once the age exceeds twice the polling
    /// interval; Unknown until the first success.
    pub fn freshness(&self, now: DateTime<Utc>) -> Freshness {
        match self.age(now) {
            None => Freshness::Unknown,
            Some(age) if age > ChronoDuration::seconds(self.interval_secs.saturating_mul(2) as i64) => {
                Freshness::Stale
            }
            Some(_) => Freshness::Fresh,
        }
    }
}

/// Read-only union of all source states, published to presenters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSnapshot {
    pub states: BTreeMap<SourceId, SourceState>,
    pub generated_at: DateTime<Utc>,
}

impl AppSnapshot {
    pub fn new(intervals: &[(SourceId, Duration)]) -> Self {
        let states = intervals
            .iter()
            .map(|(id, interval)| (*id, SourceState::new(*interval)))
            .collect();
        Self {
            states,
            generated_at: Utc::now(),
        }
    }

    pub fn state(&self, id: SourceId) -> Option<&SourceState> {
        self.states.get(&id)
    }
}

/// Single writer for all source states.
///
/// `apply` merges one fetch result and notifies subscribers; presenters only
/// ever see immutable snapshots.
pub struct Aggregator {
    inner: Mutex<AppSnapshot>,
    tx: watch::Sender<AppSnapshot>,
}

impl Aggregator {
    /// Create an aggregator tracking the given sources
    pub fn new(intervals: &[(SourceId, Duration)]) -> Self {
        let snapshot = AppSnapshot::new(intervals);
        let (tx, _rx) = watch::channel(snapshot.clone());
        Self {
            inner: Mutex::new(snapshot),
            tx,
        }
    }

    /// Subscribe to snapshot changes
    pub fn subscribe(&self) -> watch::Receiver<AppSnapshot> {
        self.tx.subscribe()
    }

    /// Current snapshot
    pub fn snapshot(&self) -> AppSnapshot {
        self.inner.lock().unwrap().clone()
    }

    /// Merge one fetch result for `source` and publish the new snapshot.
    ///
    /// Success replaces the payload and clears the error; failure records the
    /// error and leaves the last good payload untouched.
    pub fn apply(&self, source: SourceId, result: FetchResult) {
        let now = Utc::now();
        let snapshot = {
            let mut inner = self.inner.lock().unwrap();
            let state = inner
                .states
                .entry(source)
                .or_insert_with(|| SourceState::new(source.default_interval()));

            match result {
                Ok(payload) => {
                    debug_assert_eq!(payload.source_id(), source);
                    state.payload = Some(payload);
                    state.fetched_at = Some(now);
                    state.last_error = None;
                    tracing::debug!(source = %source, "applied successful fetch");
                }
                Err(ref e) => {
                    state.last_error = Some(SourceError::from_fetch(e, now));
                    tracing::warn!(source = %source, kind = e.kind(), "fetch failed: {}", e);
                }
            }

            inner.generated_at = now;
            inner.clone()
        };

        self.tx.send_replace(snapshot);
    }

    /// Pre-seed states from a cached snapshot, keeping configured intervals.
    ///
    /// Only payloads and their capture times are taken; cached errors are not
    /// resurrected. Freshness falls out of the payload age at read time.
    pub fn seed(&self, cached: &AppSnapshot) {
        let snapshot = {
            let mut inner = self.inner.lock().unwrap();
            for (id, state) in &mut inner.states {
                if let Some(prev) = cached.states.get(id) {
                    if let (Some(payload), Some(at)) = (&prev.payload, prev.fetched_at) {
                        state.payload = Some(payload.clone());
                        state.fetched_at = Some(at);
                    }
                }
            }
            inner.generated_at = Utc::now();
            inner.clone()
        };
        self.tx.send_replace(snapshot);
    }
}
