//! Settings management for vvvwatch
//!
//! Handles persistent configuration including:
//! - Enabled/disabled sources and per-source polling intervals
//! - CoinGecko token id, display currencies and the holding amount
//! - Venice admin key resolution (env first, then key file)

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::SourceId;

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Enabled source IDs (by CLI name)
    pub enabled_sources: HashSet<String>,

    /// Polling interval for the usage source in seconds
    pub usage_interval_secs: u64,

    /// Polling interval for the web-usage source in seconds
    pub web_usage_interval_secs: u64,

    /// Polling interval for the price source in seconds
    pub price_interval_secs: u64,

    /// Polling interval for the cost-analysis source in seconds
    pub cost_interval_secs: u64,

    /// CoinGecko token id for the price source
    pub token_id: String,

    /// Display currencies for the price source (lowercase codes)
    pub currencies: Vec<String>,

    /// User-entered token holding quantity; display values derive from it
    pub holding_amount: f64,

    /// Analysis window for web usage and cost analysis, in days
    pub analysis_days: u32,
}

impl Default for Settings {
    fn default() -> Self {
        let enabled = SourceId::all()
            .iter()
            .map(|id| id.cli_name().to_string())
            .collect();

        Self {
            enabled_sources: enabled,
            usage_interval_secs: 30,
            web_usage_interval_secs: 60,
            price_interval_secs: 60,
            cost_interval_secs: 300,
            token_id: "venice-token".to_string(),
            currencies: vec!["usd".to_string(), "aud".to_string()],
            holding_amount: 2500.0,
            analysis_days: 7,
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("vvvwatch").join("settings.json"))
    }

    /// Load settings from disk, falling back to defaults on absence or
    /// corruption
    pub fn load() -> Self {
        if let Some(path) = Self::settings_path() {
            if path.exists() {
                if let Ok(content) = std::fs::read_to_string(&path) {
                    if let Ok(settings) = serde_json::from_str(&content) {
                        return settings;
                    }
                    tracing::warn!("settings file unreadable, using defaults");
                }
            }
        }
        Self::default()
    }

    /// Save settings to disk
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::settings_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine settings path"))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;

        Ok(())
    }

    /// Polling interval for a source, honoring overrides
    pub fn interval_for(&self, id: SourceId) -> Duration {
        let secs = match id {
            SourceId::Usage => self.usage_interval_secs,
            SourceId::WebUsage => self.web_usage_interval_secs,
            SourceId::Price => self.price_interval_secs,
            SourceId::Cost => self.cost_interval_secs,
        };
        if secs == 0 {
            id.default_interval()
        } else {
            Duration::from_secs(secs)
        }
    }

    /// Check if a source is enabled
    pub fn is_source_enabled(&self, id: SourceId) -> bool {
        self.enabled_sources.contains(id.cli_name())
    }

    /// Toggle a source's enabled state, returning the new state
    pub fn toggle_source(&mut self, id: SourceId) -> bool {
        let name = id.cli_name().to_string();
        if self.enabled_sources.contains(&name) {
            self.enabled_sources.remove(&name);
            false
        } else {
            self.enabled_sources.insert(name);
            true
        }
    }

    /// Get list of enabled source IDs, in display order
    pub fn enabled_source_ids(&self) -> Vec<SourceId> {
        SourceId::all()
            .iter()
            .filter(|id| self.is_source_enabled(**id))
            .copied()
            .collect()
    }

    /// Update the holding amount. Non-positive or non-finite input is
    /// rejected and the previous value kept.
    pub fn set_holding_amount(&mut self, amount: f64) -> Result<(), String> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err("Holding amount must be a positive number".to_string());
        }
        self.holding_amount = amount;
        Ok(())
    }
}

/// Venice API key storage
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VeniceKeys {
    /// Admin key for billing and api-key endpoints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_key: Option<String>,
}

impl VeniceKeys {
    /// Get the key file path
    pub fn keys_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("vvvwatch").join("api_keys.json"))
    }

    /// Load keys from disk
    pub fn load() -> Self {
        if let Some(path) = Self::keys_path() {
            if path.exists() {
                if let Ok(content) = std::fs::read_to_string(&path) {
                    if let Ok(keys) = serde_json::from_str(&content) {
                        return keys;
                    }
                }
            }
        }
        Self::default()
    }

    /// Save keys to disk
    pub fn save(&self) -> anyhow::Result<()> {
        let path =
            Self::keys_path().ok_or_else(|| anyhow::anyhow!("Could not determine key path"))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;

        Ok(())
    }
}

/// Resolve the Venice admin key: environment first, key file second.
/// The key is passed through to the API as-is, never validated locally.
pub fn resolve_admin_key() -> Option<String> {
    for var in ["VENICE_ADMIN_API_KEY", "VENICE_API_KEY"] {
        if let Ok(key) = std::env::var(var) {
            if !key.trim().is_empty() {
                return Some(key.trim().to_string());
            }
        }
    }
    VeniceKeys::load().admin_key.filter(|k| !k.trim().is_empty())
}

/// Mask a key for display: first and last four characters only.
/// Counts characters, not bytes; keys are not guaranteed to be ASCII.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 12 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else if chars.len() > 4 {
        let head: String = chars[..4].iter().collect();
        format!("{}...", head)
    } else {
        "****".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert!(settings.is_source_enabled(SourceId::Usage));
        assert!(settings.is_source_enabled(SourceId::Price));
        assert_eq!(settings.token_id, "venice-token");
        assert_eq!(settings.currencies, vec!["usd", "aud"]);
        assert_eq!(settings.holding_amount, 2500.0);
        assert_eq!(settings.analysis_days, 7);
    }

    #[test]
    fn test_interval_for() {
        let mut settings = Settings::default();
        assert_eq!(settings.interval_for(SourceId::Usage), Duration::from_secs(30));
        assert_eq!(settings.interval_for(SourceId::Cost), Duration::from_secs(300));

        settings.price_interval_secs = 120;
        assert_eq!(settings.interval_for(SourceId::Price), Duration::from_secs(120));

        // Zero falls back to the source's default rather than spinning
        settings.price_interval_secs = 0;
        assert_eq!(settings.interval_for(SourceId::Price), Duration::from_secs(60));
    }

    #[test]
    fn test_toggle_source() {
        let mut settings = Settings::default();
        assert!(settings.is_source_enabled(SourceId::Cost));

        let enabled = settings.toggle_source(SourceId::Cost);
        assert!(!enabled);
        assert!(!settings.is_source_enabled(SourceId::Cost));

        let enabled = settings.toggle_source(SourceId::Cost);
        assert!(enabled);
    }

    #[test]
    fn test_enabled_source_ids_order() {
        let settings = Settings::default();
        assert_eq!(settings.enabled_source_ids(), SourceId::all().to_vec());
    }

    #[test]
    fn test_set_holding_amount_validation() {
        let mut settings = Settings::default();
        assert!(settings.set_holding_amount(10.0).is_ok());
        assert_eq!(settings.holding_amount, 10.0);

        assert!(settings.set_holding_amount(0.0).is_err());
        assert!(settings.set_holding_amount(-5.0).is_err());
        assert!(settings.set_holding_amount(f64::NAN).is_err());
        assert_eq!(settings.holding_amount, 10.0);
    }

    #[test]
    fn test_settings_serde_round_trip() {
        let mut settings = Settings::default();
        settings.holding_amount = 42.5;
        settings.toggle_source(SourceId::WebUsage);

        let json = serde_json::to_string(&settings).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.holding_amount, 42.5);
        assert!(!back.is_source_enabled(SourceId::WebUsage));
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let back: Settings = serde_json::from_str(r#"{"holding_amount": 7.0}"#).unwrap();
        assert_eq!(back.holding_amount, 7.0);
        assert_eq!(back.token_id, "venice-token");
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("sk-veniceabcdef123456"), "sk-v...3456");
        assert_eq!(mask_key("short1"), "shor...");
        assert_eq!(mask_key("abc"), "****");
    }

    #[test]
    fn test_mask_key_multibyte() {
        // Stored keys are arbitrary strings; masking must not split a char
        assert_eq!(mask_key("日本語テストキーです追加分です"), "日本語テ...加分です");
        assert_eq!(mask_key("キー若干長め"), "キー若干...");
        assert_eq!(mask_key("キー"), "****");
    }
}
