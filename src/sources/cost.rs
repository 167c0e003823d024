//! Cost source with an incremental billing cache
//!
//! The cost window can span thousands of billing records, so fetched pages
//! are cached on disk. A fresh cache is served as-is; a recent one is
//! topped up with an incremental fetch that starts shortly before the last
//! fetch time and dedupes on record timestamps; an old one triggers a full
//! refetch of the window.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::{
    CostSnapshot, FetchError, FetchResult, SkuUsage, SourceFetcher, SourceId, SourcePayload,
};

use super::billing::{merge_records, parse_billing_page, BillingRecord, MAX_PAGES, PAGE_SIZE};
use super::venice::{billing_window, format_api_timestamp, VeniceClient};

/// Cached records younger than this are served without any network call
const CACHE_TTL_SECS: i64 = 300;
/// Below this age an incremental fetch suffices; above it, full refetch
const INCREMENTAL_THRESHOLD_SECS: i64 = 3600;
/// Incremental fetches start this far before the last fetch time
const OVERLAP_SECS: i64 = 300;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BillingCacheFile {
    fetched_at: DateTime<Utc>,
    window_days: u32,
    records: Vec<BillingRecord>,
}

/// On-disk cache of billing records for the cost window
pub struct BillingCache {
    path: PathBuf,
}

impl BillingCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn at_default_location() -> Option<Self> {
        let dir = dirs::data_local_dir()?.join("vvvwatch");
        Some(Self::new(dir.join("billing-cache.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self, window_days: u32) -> Option<BillingCacheFile> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        let cache: BillingCacheFile = match serde_json::from_str(&raw) {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "discarding unreadable billing cache");
                return None;
            }
        };
        // A cache for a different window cannot be topped up incrementally
        (cache.window_days == window_days).then_some(cache)
    }

    fn save(&self, cache: &BillingCacheFile) {
        let result = (|| -> std::io::Result<()> {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let json = serde_json::to_string(cache)?;
            std::fs::write(&self.path, json)
        })();
        if let Err(e) = result {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to write billing cache");
        }
    }
}

/// Fetcher for the cost source
pub struct CostFetcher {
    client: VeniceClient,
    window_days: u32,
    cache: Option<BillingCache>,
}

impl CostFetcher {
    pub fn new(client: VeniceClient, window_days: u32, cache: Option<BillingCache>) -> Self {
        Self {
            client,
            window_days,
            cache,
        }
    }

    async fn fetch_pages(&self, params: &[(&str, String)]) -> Result<Vec<BillingRecord>, FetchError> {
        let mut records = Vec::new();
        let mut page = 1u64;
        loop {
            let mut page_params = params.to_vec();
            page_params.push(("limit", PAGE_SIZE.to_string()));
            page_params.push(("page", page.to_string()));
            page_params.push(("sortOrder", "desc".to_string()));

            let body = self.client.get_json("/billing/usage", &page_params).await?;
            let parsed = parse_billing_page(&body)?;
            records.extend(parsed.records);

            if page >= parsed.total_pages || page >= MAX_PAGES {
                break;
            }
            page += 1;
        }
        Ok(records)
    }

    async fn window_records(&self, now: DateTime<Utc>) -> Result<Vec<BillingRecord>, FetchError> {
        let cached = self.cache.as_ref().and_then(|c| c.load(self.window_days));
        let window_start = now - chrono::Duration::days(self.window_days as i64);
        let cutoff = format_api_timestamp(window_start);

        if let Some(cache) = cached {
            let age = (now - cache.fetched_at).num_seconds();
            if age < CACHE_TTL_SECS {
                tracing::debug!(age_secs = age, "serving cost window from billing cache");
                let mut records = cache.records;
                records.retain(|r| r.timestamp.as_str() >= cutoff.as_str());
                return Ok(records);
            }
            if age < INCREMENTAL_THRESHOLD_SECS {
                let since = cache.fetched_at - chrono::Duration::seconds(OVERLAP_SECS);
                let params = [
                    ("startDate", format_api_timestamp(since)),
                    ("endDate", format_api_timestamp(now)),
                ];
                let fresh = self.fetch_pages(&params).await?;
                tracing::debug!(fresh = fresh.len(), "incremental billing fetch");
                let merged = merge_records(cache.records, fresh, &cutoff);
                self.store(now, &merged);
                return Ok(merged);
            }
        }

        let params = billing_window(self.window_days, now);
        let records = self.fetch_pages(&params).await?;
        tracing::debug!(records = records.len(), "full billing fetch for cost window");
        self.store(now, &records);
        Ok(records)
    }

    fn store(&self, now: DateTime<Utc>, records: &[BillingRecord]) {
        if let Some(cache) = &self.cache {
            cache.save(&BillingCacheFile {
                fetched_at: now,
                window_days: self.window_days,
                records: records.to_vec(),
            });
        }
    }
}

#[async_trait]
impl SourceFetcher for CostFetcher {
    fn id(&self) -> SourceId {
        SourceId::Cost
    }

    async fn fetch(&self) -> FetchResult {
        let records = self.window_records(Utc::now()).await?;
        Ok(SourcePayload::Cost(aggregate_cost(
            &records,
            self.window_days,
        )))
    }
}

/// Aggregate billing records into window cost totals
pub fn aggregate_cost(records: &[BillingRecord], window_days: u32) -> CostSnapshot {
    let mut total_usd = 0.0;
    let mut total_diem = 0.0;
    let mut by_sku: BTreeMap<String, SkuUsage> = BTreeMap::new();

    for record in records {
        match record.currency.as_str() {
            "USD" => total_usd += record.amount,
            "DIEM" => total_diem += record.amount,
            _ => {}
        }
        let entry = by_sku.entry(record.sku.clone()).or_insert_with(|| SkuUsage {
            sku: record.sku.clone(),
            currency: record.currency.clone(),
            amount: 0.0,
            units: 0.0,
            requests: 0,
            notes: (!record.notes.is_empty()).then(|| record.notes.clone()),
        });
        entry.amount += record.amount;
        entry.units += record.units;
        entry.requests += 1;
    }

    CostSnapshot {
        window_days,
        total_usd,
        total_diem,
        record_count: records.len() as u64,
        by_sku: by_sku.into_values().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(sku: &str, currency: &str, amount: f64, timestamp: &str) -> BillingRecord {
        BillingRecord {
            sku: sku.to_string(),
            amount,
            currency: currency.to_string(),
            units: 1.0,
            price_per_unit_usd: 0.0,
            timestamp: timestamp.to_string(),
            notes: "API Inference".to_string(),
        }
    }

    #[test]
    fn test_aggregate_cost_totals_by_currency() {
        let records = vec![
            record("llama-3.3-70b", "DIEM", 0.5, "2026-03-08T10:00:00Z"),
            record("llama-3.3-70b", "DIEM", 0.25, "2026-03-08T11:00:00Z"),
            record("venice-sd35", "USD", 0.04, "2026-03-08T12:00:00Z"),
        ];
        let snapshot = aggregate_cost(&records, 7);

        assert_eq!(snapshot.record_count, 3);
        assert!((snapshot.total_diem - 0.75).abs() < 1e-9);
        assert!((snapshot.total_usd - 0.04).abs() < 1e-9);
        assert_eq!(snapshot.by_sku.len(), 2);
    }

    #[test]
    fn test_aggregate_cost_empty() {
        let snapshot = aggregate_cost(&[], 30);
        assert_eq!(snapshot.record_count, 0);
        assert_eq!(snapshot.total_usd, 0.0);
        assert!(snapshot.by_sku.is_empty());
    }

    #[test]
    fn test_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BillingCache::new(dir.path().join("billing-cache.json"));
        let file = BillingCacheFile {
            fetched_at: Utc::now(),
            window_days: 7,
            records: vec![record("llama-3.3-70b", "DIEM", 0.5, "2026-03-08T10:00:00Z")],
        };
        cache.save(&file);

        let loaded = cache.load(7).unwrap();
        assert_eq!(loaded.records, file.records);
        assert_eq!(loaded.window_days, 7);
    }

    #[test]
    fn test_cache_rejects_other_window() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BillingCache::new(dir.path().join("billing-cache.json"));
        cache.save(&BillingCacheFile {
            fetched_at: Utc::now(),
            window_days: 7,
            records: vec![],
        });
        assert!(cache.load(30).is_none());
    }

    #[test]
    fn test_cache_corrupt_file_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("billing-cache.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(BillingCache::new(path).load(7).is_none());
    }
}
