//! Token price source backed by the CoinGecko simple-price endpoint

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::core::{FetchError, FetchResult, PriceSnapshot, SourceFetcher, SourceId, SourcePayload};

const COINGECKO_URL: &str = "https://api.coingecko.com/api/v3/simple/price";
const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Fetcher for the token price source
pub struct PriceFetcher {
    client: reqwest::Client,
    url: String,
    token_id: String,
    currencies: Vec<String>,
}

impl PriceFetcher {
    pub fn new(token_id: impl Into<String>, currencies: &[String]) -> Result<Self, FetchError> {
        Self::with_url(COINGECKO_URL, token_id, currencies)
    }

    /// Fetcher against an explicit endpoint (tests point this at a stub)
    pub fn with_url(
        url: impl Into<String>,
        token_id: impl Into<String>,
        currencies: &[String],
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            token_id: token_id.into(),
            currencies: currencies.to_vec(),
        })
    }
}

#[async_trait]
impl SourceFetcher for PriceFetcher {
    fn id(&self) -> SourceId {
        SourceId::Price
    }

    async fn fetch(&self) -> FetchResult {
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("ids", self.token_id.as_str()),
                ("vs_currencies", &self.currencies.join(",")),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout(REQUEST_TIMEOUT_SECS)
                } else {
                    FetchError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Network(format!("HTTP {}", status.as_u16())));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))?;
        let snapshot = parse_price_response(&body, &self.token_id, &self.currencies)?;
        tracing::debug!(token = %self.token_id, "fetched token price");
        Ok(SourcePayload::Price(snapshot))
    }
}

/// Extract per-currency prices for the requested token
pub fn parse_price_response(
    body: &Value,
    token_id: &str,
    currencies: &[String],
) -> Result<PriceSnapshot, FetchError> {
    let entry = body
        .get(token_id)
        .and_then(Value::as_object)
        .ok_or_else(|| FetchError::Parse(format!("no price data for token '{}'", token_id)))?;

    let mut prices = BTreeMap::new();
    for currency in currencies {
        if let Some(value) = entry.get(currency).and_then(Value::as_f64) {
            prices.insert(currency.clone(), value);
        }
    }
    if prices.is_empty() {
        return Err(FetchError::Parse(format!(
            "no requested currencies in price data for '{}'",
            token_id
        )));
    }

    Ok(PriceSnapshot::new(token_id, prices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn currencies() -> Vec<String> {
        vec!["usd".to_string(), "aud".to_string()]
    }

    #[test]
    fn test_parse_price_response() {
        let body = json!({
            "venice-token": { "usd": 1.82, "aud": 2.75 }
        });
        let snapshot = parse_price_response(&body, "venice-token", &currencies()).unwrap();
        assert_eq!(snapshot.price("usd"), Some(1.82));
        assert_eq!(snapshot.price("aud"), Some(2.75));
    }

    #[test]
    fn test_parse_price_response_missing_token() {
        let body = json!({ "bitcoin": { "usd": 60000.0 } });
        let err = parse_price_response(&body, "venice-token", &currencies()).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn test_parse_price_response_partial_currencies() {
        let body = json!({
            "venice-token": { "usd": 1.82 }
        });
        let snapshot = parse_price_response(&body, "venice-token", &currencies()).unwrap();
        assert_eq!(snapshot.price("usd"), Some(1.82));
        assert_eq!(snapshot.price("aud"), None);
    }

    #[test]
    fn test_parse_price_response_no_currencies_is_parse_error() {
        let body = json!({ "venice-token": {} });
        let err = parse_price_response(&body, "venice-token", &currencies()).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }
}
