//! Typed payload records produced by the fetchers
//!
//! One record type per data source, plus [`SourcePayload`] as the union the
//! aggregator stores. Derived display values (holding totals) are computed on
//! demand and never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::SourceId;

/// Current account balance and daily limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceInfo {
    /// Current DIEM balance
    pub diem: f64,
    /// Current USD equivalent balance
    pub usd: f64,
    /// Daily DIEM consumption limit
    pub daily_diem_limit: f64,
    /// Daily USD consumption limit
    pub daily_usd_limit: f64,
    /// When the daily limits reset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_epoch_begins: Option<DateTime<Utc>>,
}

/// Usage attributed to a single API key (trailing seven days)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKeyUsage {
    pub id: String,
    /// User-assigned key description
    pub name: String,
    pub diem: f64,
    pub usd: f64,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Consumption totals for the current UTC day
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DailyTotals {
    pub diem: f64,
    pub usd: f64,
}

/// Balance, limits and per-key usage from the Venice admin API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub balance: BalanceInfo,
    pub today: DailyTotals,
    pub keys: Vec<ApiKeyUsage>,
}

impl UsageSnapshot {
    /// Remaining share of today's DIEM limit, 0..=1
    pub fn diem_limit_remaining(&self) -> Option<f64> {
        if self.balance.daily_diem_limit <= 0.0 {
            return None;
        }
        Some(((self.balance.daily_diem_limit - self.today.diem) / self.balance.daily_diem_limit).clamp(0.0, 1.0))
    }
}

/// Aggregated consumption for one SKU (model or service)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkuUsage {
    pub sku: String,
    /// Billing currency the SKU charges in (USD, DIEM or VCU)
    pub currency: String,
    pub amount: f64,
    pub units: f64,
    pub requests: u64,
    /// Usage type description from the billing feed, e.g. "Image Inference"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Web-app consumption over the analysis window, API inference excluded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebUsageSnapshot {
    pub window_days: u32,
    pub diem: f64,
    pub usd: f64,
    pub vcu: f64,
    pub total_requests: u64,
    pub by_sku: Vec<SkuUsage>,
}

/// Token prices keyed by lowercase currency code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub token_id: String,
    pub prices: BTreeMap<String, f64>,
}

impl PriceSnapshot {
    pub fn new(token_id: impl Into<String>, prices: BTreeMap<String, f64>) -> Self {
        Self {
            token_id: token_id.into(),
            prices,
        }
    }

    /// Single-currency snapshot, mostly for tests
    pub fn single(currency: &str, price: f64) -> Self {
        let mut prices = BTreeMap::new();
        prices.insert(currency.to_lowercase(), price);
        Self {
            token_id: "venice-token".to_string(),
            prices,
        }
    }

    pub fn price(&self, currency: &str) -> Option<f64> {
        self.prices.get(&currency.to_lowercase()).copied()
    }

    /// Derived holding value: unit price times the user-entered quantity.
    /// Computed at render time, never stored.
    pub fn holding_value(&self, currency: &str, quantity: f64) -> Option<f64> {
        self.price(currency).map(|p| p * quantity)
    }
}

/// Cost analysis over the billing window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSnapshot {
    pub window_days: u32,
    pub total_usd: f64,
    pub total_diem: f64,
    pub record_count: u64,
    pub by_sku: Vec<SkuUsage>,
}

/// Union of all payload types, tagged by source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SourcePayload {
    Usage(UsageSnapshot),
    WebUsage(WebUsageSnapshot),
    Price(PriceSnapshot),
    Cost(CostSnapshot),
}

impl SourcePayload {
    /// The source this payload belongs to
    pub fn source_id(&self) -> SourceId {
        match self {
            SourcePayload::Usage(_) => SourceId::Usage,
            SourcePayload::WebUsage(_) => SourceId::WebUsage,
            SourcePayload::Price(_) => SourceId::Price,
            SourcePayload::Cost(_) => SourceId::Cost,
        }
    }

    pub fn as_usage(&self) -> Option<&UsageSnapshot> {
        match self {
            SourcePayload::Usage(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_web_usage(&self) -> Option<&WebUsageSnapshot> {
        match self {
            SourcePayload::WebUsage(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_price(&self) -> Option<&PriceSnapshot> {
        match self {
            SourcePayload::Price(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_cost(&self) -> Option<&CostSnapshot> {
        match self {
            SourcePayload::Cost(s) => Some(s),
            _ => None,
        }
    }
}
