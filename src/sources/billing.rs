//! Billing feed records and pagination
//!
//! `/billing/usage` pages are shared ground for the web-usage and cost
//! sources; this module owns the record shape and page envelope parsing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::FetchError;

/// Upper bound on pages fetched in one pass
pub const MAX_PAGES: u64 = 20;
/// Records per page
pub const PAGE_SIZE: u64 = 500;

/// One line item from the billing feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingRecord {
    pub sku: String,
    /// Consumption as a positive number; the feed reports debits as negative
    pub amount: f64,
    pub currency: String,
    pub units: f64,
    #[serde(default)]
    pub price_per_unit_usd: f64,
    /// ISO 8601; also the dedupe key when merging with cached pages
    pub timestamp: String,
    /// Usage type, e.g. "API Inference" or "Image Inference"
    #[serde(default)]
    pub notes: String,
}

impl BillingRecord {
    /// Parse one feed entry; entries without a sku or currency are skipped
    pub fn from_value(v: &Value) -> Option<Self> {
        let sku = v.get("sku")?.as_str()?.to_string();
        let currency = v.get("currency")?.as_str()?.to_string();
        Some(Self {
            sku,
            amount: lenient_f64(v.get("amount")).unwrap_or(0.0).abs(),
            currency,
            units: lenient_f64(v.get("units")).unwrap_or(0.0),
            price_per_unit_usd: lenient_f64(v.get("pricePerUnitUsd")).unwrap_or(0.0),
            timestamp: v.get("timestamp").and_then(Value::as_str).unwrap_or_default().to_string(),
            notes: v.get("notes").and_then(Value::as_str).unwrap_or_default().to_string(),
        })
    }

    /// Whether this record is API inference (as opposed to web-app usage)
    pub fn is_api_inference(&self) -> bool {
        self.notes == "API Inference"
    }
}

/// One parsed page of the billing feed
#[derive(Debug, Clone)]
pub struct BillingPage {
    pub records: Vec<BillingRecord>,
    pub total_pages: u64,
}

/// Parse a `/billing/usage` response body
pub fn parse_billing_page(body: &Value) -> Result<BillingPage, FetchError> {
    let data = body
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::Parse("billing response missing 'data' array".to_string()))?;

    let records = data.iter().filter_map(BillingRecord::from_value).collect();
    let total_pages = body
        .get("pagination")
        .and_then(|p| p.get("totalPages"))
        .and_then(Value::as_u64)
        .unwrap_or(1);

    Ok(BillingPage { records, total_pages })
}

/// Merge newly fetched records into cached ones, deduplicating by timestamp
/// and dropping anything older than `cutoff` (ISO 8601 compares as text)
pub fn merge_records(
    cached: Vec<BillingRecord>,
    fresh: Vec<BillingRecord>,
    cutoff: &str,
) -> Vec<BillingRecord> {
    let existing: std::collections::HashSet<String> =
        cached.iter().map(|r| r.timestamp.clone()).collect();

    let mut merged = cached;
    merged.extend(fresh.into_iter().filter(|r| !existing.contains(&r.timestamp)));
    merged.retain(|r| r.timestamp.as_str() >= cutoff);
    merged
}

fn lenient_f64(v: Option<&Value>) -> Option<f64> {
    let v = v?;
    v.as_f64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))
}
