//! Web-app usage source
//!
//! Pages through the billing feed for the analysis window and keeps only
//! web-app consumption; the feed cannot filter server-side, so API
//! inference records are dropped client-side by their notes field.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;

use crate::core::{
    FetchResult, SkuUsage, SourceFetcher, SourceId, SourcePayload, WebUsageSnapshot,
};

use super::billing::{parse_billing_page, BillingRecord, MAX_PAGES, PAGE_SIZE};
use super::venice::{billing_window, VeniceClient};

/// Fetcher for the web-usage source
pub struct WebUsageFetcher {
    client: VeniceClient,
    window_days: u32,
}

impl WebUsageFetcher {
    pub fn new(client: VeniceClient, window_days: u32) -> Self {
        Self {
            client,
            window_days,
        }
    }
}

#[async_trait]
impl SourceFetcher for WebUsageFetcher {
    fn id(&self) -> SourceId {
        SourceId::WebUsage
    }

    async fn fetch(&self) -> FetchResult {
        let window = billing_window(self.window_days, Utc::now());
        let mut records = Vec::new();
        let mut page = 1u64;

        loop {
            let mut params = window.to_vec();
            params.push(("limit", PAGE_SIZE.to_string()));
            params.push(("page", page.to_string()));
            params.push(("sortOrder", "desc".to_string()));

            let body = self.client.get_json("/billing/usage", &params).await?;
            let parsed = parse_billing_page(&body)?;
            records.extend(parsed.records);

            if page >= parsed.total_pages || page >= MAX_PAGES {
                break;
            }
            page += 1;
        }

        tracing::debug!(pages = page, records = records.len(), "fetched billing feed for web usage");
        Ok(SourcePayload::WebUsage(aggregate_web_usage(
            &records,
            self.window_days,
        )))
    }
}

/// Aggregate billing records into web-usage totals, dropping API inference
pub fn aggregate_web_usage(records: &[BillingRecord], window_days: u32) -> WebUsageSnapshot {
    let mut diem = 0.0;
    let mut usd = 0.0;
    let mut vcu = 0.0;
    let mut total_requests = 0u64;
    let mut by_sku: BTreeMap<String, SkuUsage> = BTreeMap::new();

    for record in records.iter().filter(|r| !r.is_api_inference()) {
        match record.currency.as_str() {
            "USD" => usd += record.amount,
            "DIEM" => diem += record.amount,
            "VCU" => vcu += record.amount,
            _ => {}
        }
        total_requests += 1;

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

    WebUsageSnapshot {
        window_days,
        diem,
        usd,
        vcu,
        total_requests,
        by_sku: by_sku.into_values().collect(),
    }
}
