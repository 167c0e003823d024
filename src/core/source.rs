//! Source identifiers and the capability registry

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Unique identifier for a data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    /// Account balance, daily limits and per-key usage (Venice admin API)
    Usage,
    /// Web-app consumption from the billing feed (Venice admin API)
    WebUsage,
    /// VVV token price (CoinGecko, public)
    Price,
    /// Cost analysis over the billing window (Venice admin API)
    Cost,
}

impl SourceId {
    /// Get all source IDs, in display order
    pub fn all() -> &'static [SourceId] {
        &[
            SourceId::Price,
            SourceId::Usage,
            SourceId::WebUsage,
            SourceId::Cost,
        ]
    }

    /// Get the CLI name for this source
    pub fn cli_name(&self) -> &'static str {
        match self {
            SourceId::Usage => "usage",
            SourceId::WebUsage => "web-usage",
            SourceId::Price => "price",
            SourceId::Cost => "cost",
        }
    }

    /// Get the display name for this source
    pub fn display_name(&self) -> &'static str {
        match self {
            SourceId::Usage => "Venice Usage",
            SourceId::WebUsage => "Web App Usage",
            SourceId::Price => "VVV Price",
            SourceId::Cost => "Cost Analysis",
        }
    }

    /// Parse from CLI name string
    pub fn from_cli_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "usage" | "balance" => Some(SourceId::Usage),
            "web-usage" | "web" | "webusage" => Some(SourceId::WebUsage),
            "price" | "vvv" | "token" => Some(SourceId::Price),
            "cost" | "cost-analysis" | "billing" => Some(SourceId::Cost),
            _ => None,
        }
    }

    /// Default polling interval for this source
    pub fn default_interval(&self) -> Duration {
        match self {
            SourceId::Usage => Duration::from_secs(30),
            SourceId::WebUsage => Duration::from_secs(60),
            SourceId::Price => Duration::from_secs(60),
            SourceId::Cost => Duration::from_secs(300),
        }
    }

    /// Whether this source needs the Venice admin key
    pub fn requires_admin_key(&self) -> bool {
        !matches!(self, SourceId::Price)
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.cli_name())
    }
}

/// Which sources can actually run, resolved once at startup.
///
/// Sources that hit the Venice billing endpoints are only available when an
/// admin key is configured; the public price feed always is.
#[derive(Debug, Clone)]
pub struct Capabilities {
    has_admin_key: bool,
}

impl Capabilities {
    pub fn resolve(has_admin_key: bool) -> Self {
        Self { has_admin_key }
    }

    pub fn has_admin_key(&self) -> bool {
        self.has_admin_key
    }

    /// Check whether a source can run under these capabilities
    pub fn supports(&self, id: SourceId) -> bool {
        self.has_admin_key || !id.requires_admin_key()
    }

    /// All sources that can run, in display order
    pub fn available(&self) -> Vec<SourceId> {
        SourceId::all()
            .iter()
            .copied()
            .filter(|id| self.supports(*id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_id_all() {
        let all = SourceId::all();
        assert_eq!(all.len(), 4);
        assert!(all.contains(&SourceId::Usage));
        assert!(all.contains(&SourceId::Price));
    }

    #[test]
    fn test_source_id_cli_name() {
        assert_eq!(SourceId::Usage.cli_name(), "usage");
        assert_eq!(SourceId::WebUsage.cli_name(), "web-usage");
        assert_eq!(SourceId::Price.cli_name(), "price");
        assert_eq!(SourceId::Cost.cli_name(), "cost");
    }

    #[test]
    fn test_source_id_from_cli_name() {
        assert_eq!(SourceId::from_cli_name("usage"), Some(SourceId::Usage));
        assert_eq!(SourceId::from_cli_name("web"), Some(SourceId::WebUsage));
        assert_eq!(SourceId::from_cli_name("PRICE"), Some(SourceId::Price));
        assert_eq!(SourceId::from_cli_name("billing"), Some(SourceId::Cost));
        assert_eq!(SourceId::from_cli_name("unknown"), None);
    }

    #[test]
    fn test_source_id_display() {
        assert_eq!(format!("{}", SourceId::WebUsage), "web-usage");
    }

    #[test]
    fn test_default_intervals() {
        assert_eq!(SourceId::Usage.default_interval(), Duration::from_secs(30));
        assert_eq!(SourceId::Price.default_interval(), Duration::from_secs(60));
        assert_eq!(SourceId::Cost.default_interval(), Duration::from_secs(300));
    }

    #[test]
    fn test_capabilities_without_admin_key() {
        let caps = Capabilities::resolve(false);
        assert!(caps.supports(SourceId::Price));
        assert!(!caps.supports(SourceId::Usage));
        assert!(!caps.supports(SourceId::Cost));
        assert_eq!(caps.available(), vec![SourceId::Price]);
    }

    #[test]
    fn test_capabilities_with_admin_key() {
        let caps = Capabilities::resolve(true);
        assert_eq!(caps.available().len(), 4);
    }
}
