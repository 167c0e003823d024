//! Shared Venice API client
//!
//! Bearer-authenticated GET against the Venice v1 API with error
//! classification into the fetch taxonomy. Retry policy lives with the
//! scheduler, not here; one call is one request.

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::StatusCode;
use std::time::Duration;
use url::Url;

use crate::core::FetchError;

pub const VENICE_BASE_URL: &str = "https://api.venice.ai/api/v1";

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Client for the Venice API, shared by all Venice-backed fetchers
#[derive(Debug, Clone)]
pub struct VeniceClient {
    base_url: Url,
    api_key: String,
    client: reqwest::Client,
}

impl VeniceClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, FetchError> {
        Self::with_base_url(api_key, VENICE_BASE_URL)
    }

    /// Client against an explicit base URL (tests point this at a stub)
    pub fn with_base_url(api_key: impl Into<String>, base_url: &str) -> Result<Self, FetchError> {
        // Url::join replaces the last path segment unless the base ends in '/'
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized).map_err(|e| FetchError::Parse(e.to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            base_url,
            api_key: api_key.into(),
            client,
        })
    }

    /// GET an endpoint and parse the body as JSON
    pub async fn get_json(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value, FetchError> {
        let url = self.endpoint_url(endpoint)?;

        let resp = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "application/json")
            .query(params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout(REQUEST_TIMEOUT_SECS)
                } else {
                    FetchError::from(e)
                }
            })?;

        if let Some(err) = classify_status(resp.status()) {
            return Err(err);
        }

        resp.json().await.map_err(|e| FetchError::Parse(e.to_string()))
    }

    fn endpoint_url(&self, endpoint: &str) -> Result<Url, FetchError> {
        self.base_url
            .join(endpoint.trim_start_matches('/'))
            .map_err(|e| FetchError::Parse(e.to_string()))
    }
}

/// Map an HTTP status to a fetch error, `None` for success
pub fn classify_status(status: StatusCode) -> Option<FetchError> {
    if status.is_success() {
        None
    } else if status == StatusCode::UNAUTHORIZED {
        Some(FetchError::Auth("authentication failed, check the admin key".to_string()))
    } else if status == StatusCode::FORBIDDEN {
        Some(FetchError::Auth("access denied, billing endpoints need an admin key".to_string()))
    } else {
        Some(FetchError::Network(format!("HTTP {}", status.as_u16())))
    }
}

/// Format a timestamp the way the billing endpoints expect
pub fn format_api_timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// `startDate`/`endDate` parameters covering the last `days` days
pub fn billing_window(days: u32, now: DateTime<Utc>) -> [(&'static str, String); 2] {
    let start = now - chrono::Duration::days(days as i64);
    [
        ("startDate", format_api_timestamp(start)),
        ("endDate", format_api_timestamp(now)),
    ]
}

/// `startDate`/`endDate` parameters covering the current UTC day so far
pub fn today_window(now: DateTime<Utc>) -> [(&'static str, String); 2] {
    let start = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always valid")
        .and_utc();
    [
        ("startDate", format_api_timestamp(start)),
        ("endDate", format_api_timestamp(now)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_classify_status() {
        assert!(classify_status(StatusCode::OK).is_none());
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED),
            Some(FetchError::Auth(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN),
            Some(FetchError::Auth(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR),
            Some(FetchError::Network(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            Some(FetchError::Network(_))
        ));
    }

    #[test]
    fn test_api_timestamp_format() {
        let t = Utc.with_ymd_and_hms(2026, 3, 5, 14, 30, 11).unwrap();
        assert_eq!(format_api_timestamp(t), "2026-03-05T14:30:11Z");
    }

    #[test]
    fn test_billing_window_spans_days() {
        let now = Utc.with_ymd_and_hms(2026, 3, 8, 12, 0, 0).unwrap();
        let [(_, start), (_, end)] = billing_window(7, now);
        assert_eq!(start, "2026-03-01T12:00:00Z");
        assert_eq!(end, "2026-03-08T12:00:00Z");
    }

    #[test]
    fn test_today_window_starts_at_midnight() {
        let now = Utc.with_ymd_and_hms(2026, 3, 8, 9, 15, 0).unwrap();
        let [(_, start), (_, end)] = today_window(now);
        assert_eq!(start, "2026-03-08T00:00:00Z");
        assert_eq!(end, "2026-03-08T09:15:00Z");
    }

    #[test]
    fn test_client_requires_valid_base_url() {
        assert!(VeniceClient::with_base_url("key", "not a url").is_err());
        assert!(VeniceClient::new("key").is_ok());
    }

    #[test]
    fn test_endpoint_url_keeps_base_path() {
        let client = VeniceClient::new("key").unwrap();
        let url = client.endpoint_url("/billing/usage").unwrap();
        assert_eq!(url.as_str(), "https://api.venice.ai/api/v1/billing/usage");
        let url = client.endpoint_url("api_keys").unwrap();
        assert_eq!(url.as_str(), "https://api.venice.ai/api/v1/api_keys");
    }
}
