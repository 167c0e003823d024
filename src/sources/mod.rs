//! Data source implementations
//!
//! Each source implements [`SourceFetcher`] over one upstream API. The
//! Venice sources share [`VeniceClient`] and the billing feed helpers;
//! the price source talks to CoinGecko on its own.

mod billing;
mod cost;
mod price;
mod usage;
mod venice;
mod web_usage;

pub use cost::{BillingCache, CostFetcher};
pub use price::PriceFetcher;
pub use usage::UsageFetcher;
pub use venice::VeniceClient;
pub use web_usage::WebUsageFetcher;

use std::sync::Arc;

use crate::core::{FetchError, SourceFetcher, SourceId};
use crate::settings::Settings;

/// Create a fetcher instance by source ID
pub fn create_fetcher(
    id: SourceId,
    settings: &Settings,
    admin_key: Option<&str>,
) -> Result<Arc<dyn SourceFetcher>, FetchError> {
    let venice_client = || -> Result<VeniceClient, FetchError> {
        let key = admin_key
            .ok_or_else(|| FetchError::Auth("admin API key not configured".to_string()))?;
        VeniceClient::new(key)
    };

    Ok(match id {
        SourceId::Usage => Arc::new(UsageFetcher::new(venice_client()?)),
        SourceId::WebUsage => Arc::new(WebUsageFetcher::new(
            venice_client()?,
            settings.analysis_days,
        )),
        SourceId::Price => Arc::new(PriceFetcher::new(
            settings.token_id.clone(),
            &settings.currencies,
        )?),
        SourceId::Cost => Arc::new(CostFetcher::new(
            venice_client()?,
            settings.analysis_days,
            BillingCache::at_default_location(),
        )),
    })
}
