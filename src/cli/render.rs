//! Text rendering for source payloads
//!
//! Shared by the one-shot commands and the watch dashboard. Holding value is
//! derived here from the live price and the configured quantity; it never
//! appears in any stored payload.

use chrono::{DateTime, Utc};

use crate::core::{
    format_currency, CostSnapshot, Freshness, PriceSnapshot, SourceId, SourceState, UsageSnapshot,
    WebUsageSnapshot,
};

const BAR_WIDTH: usize = 20;
/// SKU rows shown per section before the rest is summarized
const MAX_SKU_ROWS: usize = 5;

/// Render account usage as an indented text section
pub fn render_usage(snapshot: &UsageSnapshot, use_color: bool) -> String {
    let mut lines = Vec::new();
    let balance = &snapshot.balance;

    lines.push(format!(
        "  Balance: {:.2} DIEM ({})",
        balance.diem,
        format_currency(balance.usd, "usd")
    ));
    lines.push(format!(
        "  Today:   {:.2} DIEM / {} consumed",
        snapshot.today.diem,
        format_currency(snapshot.today.usd, "usd")
    ));

    if let Some(remaining) = snapshot.diem_limit_remaining() {
        let used_percent = (1.0 - remaining) * 100.0;
        let bar = render_progress_bar(used_percent, BAR_WIDTH, use_color);
        let reset = balance
            .next_epoch_begins
            .map(|t| format!(" (resets in {})", format_countdown(t, Utc::now())))
            .unwrap_or_default();
        lines.push(format!(
            "  Daily:   {} {:.0}% of {:.0} DIEM limit used{}",
            bar, used_percent, balance.daily_diem_limit, reset
        ));
    }

    if !snapshot.keys.is_empty() {
        lines.push("  Keys (trailing 7 days):".to_string());
        for key in &snapshot.keys {
            let marker = if key.is_active { "" } else { " (inactive)" };
            lines.push(format!(
                "    {:<24} {:>8.2} DIEM  {:>10}{}",
                key.name,
                key.diem,
                format_currency(key.usd, "usd"),
                marker
            ));
        }
    }

    lines.join("\n")
}

/// Render web-app usage over the analysis window
pub fn render_web_usage(snapshot: &WebUsageSnapshot) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "  Last {} days: {} requests",
        snapshot.window_days, snapshot.total_requests
    ));
    lines.push(format!(
        "  Spent:   {:.2} DIEM / {} / {:.1} VCU",
        snapshot.diem,
        format_currency(snapshot.usd, "usd"),
        snapshot.vcu
    ));
    lines.extend(sku_rows(&snapshot.by_sku));
    lines.join("\n")
}

/// Render the token price with the derived holding value
pub fn render_price(snapshot: &PriceSnapshot, holding_amount: f64, _use_color: bool) -> String {
    let mut lines = Vec::new();
    for (currency, price) in &snapshot.prices {
        lines.push(format!(
            "  {}: {}",
            currency.to_uppercase(),
            format_currency(*price, currency)
        ));
    }
    if holding_amount > 0.0 {
        if let Some(value) = snapshot.holding_value("usd", holding_amount) {
            lines.push(format!(
                "  Holding: {:.0} VVV = {}",
                holding_amount,
                format_currency(value, "usd")
            ));
        }
    }
    lines.join("\n")
}

/// Render the cost analysis over the billing window
pub fn render_cost(snapshot: &CostSnapshot) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "  Last {} days: {} records",
        snapshot.window_days, snapshot.record_count
    ));
    lines.push(format!(
        "  Total:   {} / {:.2} DIEM",
        format_currency(snapshot.total_usd, "usd"),
        snapshot.total_diem
    ));
    lines.extend(sku_rows(&snapshot.by_sku));
    lines.join("\n")
}

fn sku_rows(by_sku: &[crate::core::SkuUsage]) -> Vec<String> {
    let mut sorted: Vec<_> = by_sku.iter().collect();
    sorted.sort_by(|a, b| b.amount.partial_cmp(&a.amount).unwrap_or(std::cmp::Ordering::Equal));

    let mut lines = Vec::new();
    for sku in sorted.iter().take(MAX_SKU_ROWS) {
        lines.push(format!(
            "    {:<28} {:>8.3} {:<4} ({} req)",
            sku.sku, sku.amount, sku.currency, sku.requests
        ));
    }
    if sorted.len() > MAX_SKU_ROWS {
        lines.push(format!("    ... and {} more", sorted.len() - MAX_SKU_ROWS));
    }
    lines
}

/// Render one dashboard section for a source: header with freshness marker,
/// then payload body, "no data yet" until the first success
pub fn render_section(
    id: SourceId,
    state: &SourceState,
    now: DateTime<Utc>,
    holding_amount: f64,
    use_color: bool,
) -> String {
    let freshness = state.freshness(now);
    let marker = freshness_marker(freshness, use_color);
    let header = if use_color {
        format!("\x1b[1m{}\x1b[0m {}", id.display_name(), marker)
    } else {
        format!("{} {}", id.display_name(), marker)
    };

    let mut lines = vec![header];

    match &state.payload {
        None => lines.push("  no data yet".to_string()),
        Some(payload) => {
            let body = match payload {
                crate::core::SourcePayload::Usage(s) => render_usage(s, use_color),
                crate::core::SourcePayload::WebUsage(s) => render_web_usage(s),
                crate::core::SourcePayload::Price(s) => render_price(s, holding_amount, use_color),
                crate::core::SourcePayload::Cost(s) => render_cost(s),
            };
            lines.push(body);
            if freshness == Freshness::Stale {
                if let Some(age) = state.age(now) {
                    lines.push(format!("  stale, last updated {} ago", format_age(age)));
                }
            }
        }
    }

    if let Some(error) = &state.last_error {
        lines.push(format!("  last error ({}): {}", error.kind, error.message));
    }

    lines.join("\n")
}

fn freshness_marker(freshness: Freshness, use_color: bool) -> &'static str {
    if use_color {
        match freshness {
            Freshness::Fresh => "\x1b[32m●\x1b[0m",
            Freshness::Stale => "\x1b[33m◐\x1b[0m",
            Freshness::Unknown => "\x1b[90m?\x1b[0m",
        }
    } else {
        match freshness {
            Freshness::Fresh => "●",
            Freshness::Stale => "◐",
            Freshness::Unknown => "?",
        }
    }
}

/// Render a text-based progress bar
pub fn render_progress_bar(percent: f64, width: usize, use_color: bool) -> String {
    let filled = ((percent / 100.0) * width as f64).round() as usize;
    let empty = width.saturating_sub(filled);

    let bar = format!("[{}{}]", "█".repeat(filled), "░".repeat(empty));

    if use_color {
        let color = if percent >= 90.0 {
            "\x1b[31m"
        } else if percent >= 70.0 {
            "\x1b[33m"
        } else {
            "\x1b[32m"
        };
        format!("{}{}\x1b[0m", color, bar)
    } else {
        bar
    }
}

fn format_countdown(until: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let remaining = until - now;
    let secs = remaining.num_seconds().max(0);
    format_secs(secs)
}

fn format_age(age: chrono::Duration) -> String {
    format_secs(age.num_seconds().max(0))
}

fn format_secs(secs: i64) -> String {
    if secs >= 3600 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BalanceInfo, DailyTotals, SourcePayload};
    use std::time::Duration;

    fn usage_snapshot() -> UsageSnapshot {
        UsageSnapshot {
            balance: BalanceInfo {
                diem: 42.5,
                usd: 10.0,
                daily_diem_limit: 100.0,
                daily_usd_limit: 25.0,
                next_epoch_begins: None,
            },
            today: DailyTotals { diem: 25.0, usd: 5.0 },
            keys: Vec::new(),
        }
    }

    #[test]
    fn test_render_usage_shows_balance_and_daily_bar() {
        let text = render_usage(&usage_snapshot(), false);
        assert!(text.contains("42.50 DIEM"));
        assert!(text.contains("$10.00"));
        assert!(text.contains("25% of 100 DIEM limit used"));
    }

    #[test]
    fn test_render_price_derives_holding_value() {
        let snapshot = PriceSnapshot::single("usd", 2.0);
        let text = render_price(&snapshot, 2500.0, false);
        assert!(text.contains("USD: $2.00"));
        assert!(text.contains("Holding: 2500 VVV = $5,000.00"));
    }

    #[test]
    fn test_render_price_without_holding() {
        let snapshot = PriceSnapshot::single("usd", 2.0);
        let text = render_price(&snapshot, 0.0, false);
        assert!(!text.contains("Holding"));
    }

    #[test]
    fn test_render_section_no_data_yet() {
        let state = SourceState::new(Duration::from_secs(30));
        let text = render_section(SourceId::Usage, &state, Utc::now(), 0.0, false);
        assert!(text.contains("no data yet"));
        assert!(text.contains("?"));
    }

    #[test]
    fn test_render_section_stale_keeps_payload() {
        let now = Utc::now();
        let mut state = SourceState::new(Duration::from_secs(30));
        state.payload = Some(SourcePayload::Usage(usage_snapshot()));
        state.fetched_at = Some(now - chrono::Duration::seconds(120));
        let text = render_section(SourceId::Usage, &state, now, 0.0, false);
        assert!(text.contains("42.50 DIEM"));
        assert!(text.contains("stale, last updated 2m 0s ago"));
    }

    #[test]
    fn test_progress_bar_width() {
        let bar = render_progress_bar(50.0, 10, false);
        assert_eq!(bar, "[█████░░░░░]");
    }
}
