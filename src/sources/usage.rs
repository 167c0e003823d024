//! Usage source: balance, daily limits and per-key usage
//!
//! Combines three Venice admin endpoints into one snapshot:
//! `/api_keys/rate_limits` for balances and the next limit epoch,
//! `/api_keys` for trailing-seven-day usage per key, and `/billing/usage`
//! for today's consumption totals.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::core::{
    ApiKeyUsage, BalanceInfo, DailyTotals, FetchError, FetchResult, SourceFetcher, SourceId,
    SourcePayload, UsageSnapshot,
};

use super::venice::{today_window, VeniceClient};

const DEFAULT_DAILY_DIEM_LIMIT: f64 = 100.0;
const DEFAULT_DAILY_USD_LIMIT: f64 = 25.0;

/// Fetcher for the usage source
pub struct UsageFetcher {
    client: VeniceClient,
}

impl UsageFetcher {
    pub fn new(client: VeniceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceFetcher for UsageFetcher {
    fn id(&self) -> SourceId {
        SourceId::Usage
    }

    async fn fetch(&self) -> FetchResult {
        let limits = self.client.get_json("/api_keys/rate_limits", &[]).await?;
        let balance = parse_rate_limits(&limits)?;

        let keys_body = self.client.get_json("/api_keys", &[]).await?;
        let keys = parse_api_keys(&keys_body)?;

        let mut params = today_window(Utc::now()).to_vec();
        params.push(("limit", "500".to_string()));
        params.push(("sortOrder", "desc".to_string()));
        let billing = self.client.get_json("/billing/usage", &params).await?;
        let today = parse_daily_totals(&billing)?;

        Ok(SourcePayload::Usage(UsageSnapshot { balance, today, keys }))
    }
}

/// Parse `/api_keys/rate_limits`: balances, limits and next epoch
pub fn parse_rate_limits(body: &Value) -> Result<BalanceInfo, FetchError> {
    let data = body
        .get("data")
        .ok_or_else(|| FetchError::Parse("rate_limits response missing 'data'".to_string()))?;

    let balances = data.get("balances").cloned().unwrap_or(Value::Null);
    let diem = balances.get("DIEM").and_then(Value::as_f64).unwrap_or(0.0);
    let usd = balances.get("USD").and_then(Value::as_f64).unwrap_or(0.0);

    let next_epoch_begins = data
        .get("nextEpochBegins")
        .and_then(Value::as_str)
        .and_then(parse_timestamp);

    // Daily limits are tier defaults unless the response carries overrides
    let limits = data.get("limits").cloned().unwrap_or(Value::Null);
    let daily_diem_limit = limits
        .get("diem")
        .and_then(Value::as_f64)
        .unwrap_or(DEFAULT_DAILY_DIEM_LIMIT);
    let daily_usd_limit = limits
        .get("usd")
        .and_then(Value::as_f64)
        .unwrap_or(DEFAULT_DAILY_USD_LIMIT);

    Ok(BalanceInfo {
        diem,
        usd,
        daily_diem_limit,
        daily_usd_limit,
        next_epoch_begins,
    })
}

/// Parse `/api_keys`: one entry per key with trailing-seven-day usage
pub fn parse_api_keys(body: &Value) -> Result<Vec<ApiKeyUsage>, FetchError> {
    let data = body
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::Parse("api_keys response missing 'data' array".to_string()))?;

    let mut keys = Vec::with_capacity(data.len());
    for entry in data {
        let id = entry
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        let name = entry
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| fallback_key_name(&id));

        let usage = entry
            .get("usage")
            .and_then(|u| u.get("trailingSevenDays"))
            .cloned()
            .unwrap_or(Value::Null);
        let diem = usage.get("diem").and_then(as_lenient_f64).unwrap_or(0.0);
        let usd = usage.get("usd").and_then(as_lenient_f64).unwrap_or(0.0);

        keys.push(ApiKeyUsage {
            id,
            name,
            diem,
            usd,
            is_active: entry.get("enabled").and_then(Value::as_bool).unwrap_or(true),
            created_at: entry.get("createdAt").and_then(Value::as_str).and_then(parse_timestamp),
            last_used_at: entry.get("lastUsedAt").and_then(Value::as_str).and_then(parse_timestamp),
        });
    }

    Ok(keys)
}

/// Parse `/billing/usage` for the current day: sum |amount| per currency
pub fn parse_daily_totals(body: &Value) -> Result<DailyTotals, FetchError> {
    let data = body
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::Parse("billing response missing 'data' array".to_string()))?;

    let mut totals = DailyTotals::default();
    for entry in data {
        let amount = entry.get("amount").and_then(as_lenient_f64).unwrap_or(0.0).abs();
        match entry.get("currency").and_then(Value::as_str) {
            Some("DIEM") => totals.diem += amount,
            Some("USD") => totals.usd += amount,
            _ => {}
        }
    }

    Ok(totals)
}

/// The API reports some numbers as strings
fn as_lenient_f64(v: &Value) -> Option<f64> {
    v.as_f64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).ok().map(|t| t.with_timezone(&Utc))
}

fn fallback_key_name(id: &str) -> String {
    let tail: String = id.chars().rev().take(8).collect::<Vec<_>>().into_iter().rev().collect();
    format!("Key {}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_rate_limits() {
        let body = json!({
            "data": {
                "balances": { "DIEM": 42.5, "USD": 10.25 },
                "nextEpochBegins": "2026-03-09T00:00:00Z"
            }
        });
        let balance = parse_rate_limits(&body).unwrap();
        assert_eq!(balance.diem, 42.5);
        assert_eq!(balance.usd, 10.25);
        assert_eq!(balance.daily_diem_limit, 100.0);
        assert_eq!(balance.daily_usd_limit, 25.0);
        assert!(balance.next_epoch_begins.is_some());
    }

    #[test]
    fn test_parse_rate_limits_missing_data() {
        let body = json!({ "error": "nope" });
        assert!(matches!(parse_rate_limits(&body), Err(FetchError::Parse(_))));
    }

    #[test]
    fn test_parse_api_keys() {
        let body = json!({
            "data": [
                {
                    "id": "key_0123456789abcdef",
                    "description": "Laptop",
                    "enabled": true,
                    "createdAt": "2026-01-01T00:00:00Z",
                    "lastUsedAt": "2026-03-08T08:00:00Z",
                    "usage": { "trailingSevenDays": { "diem": "1.5", "usd": 0.25 } }
                },
                { "id": "key_fedcba9876543210", "enabled": false }
            ]
        });
        let keys = parse_api_keys(&body).unwrap();
        assert_eq!(keys.len(), 2);

        assert_eq!(keys[0].name, "Laptop");
        assert_eq!(keys[0].diem, 1.5);
        assert_eq!(keys[0].usd, 0.25);
        assert!(keys[0].is_active);
        assert!(keys[0].last_used_at.is_some());

        // Unnamed key falls back to its id tail; missing usage reads as zero
        assert_eq!(keys[1].name, "Key 76543210");
        assert_eq!(keys[1].diem, 0.0);
        assert!(!keys[1].is_active);
    }

    #[test]
    fn test_parse_daily_totals() {
        let body = json!({
            "data": [
                { "currency": "DIEM", "amount": -1.25 },
                { "currency": "DIEM", "amount": 0.75 },
                { "currency": "USD", "amount": -0.50 },
                { "currency": "VCU", "amount": 99.0 }
            ]
        });
        let totals = parse_daily_totals(&body).unwrap();
        assert_eq!(totals.diem, 2.0);
        assert_eq!(totals.usd, 0.50);
    }

    #[test]
    fn test_parse_daily_totals_empty_day_is_zero() {
        // A day with no records is a real zero, not an unknown
        let totals = parse_daily_totals(&json!({ "data": [] })).unwrap();
        assert_eq!(totals.diem, 0.0);
        assert_eq!(totals.usd, 0.0);
    }
}
