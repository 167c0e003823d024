//! Watch command - live polling dashboard
//!
//! Seeds the aggregator from the snapshot cache so the last known values
//! show immediately (marked stale), starts one polling worker per enabled
//! source, and re-renders sections as results arrive. Ctrl-C stops the
//! workers with a grace period and saves the final snapshot.

use clap::Args;
use std::collections::HashMap;
use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::cache::SnapshotCache;
use crate::core::{Aggregator, AppSnapshot, Capabilities, Scheduler, SourceId, SourceState};
use crate::settings::{resolve_admin_key, Settings};
use crate::sources::create_fetcher;

use super::render;

/// Refresh cadence for freshness markers between data updates
const MARKER_REFRESH_SECS: u64 = 5;

/// Arguments for the watch command
#[derive(Args, Debug, Default)]
pub struct WatchArgs {
    /// Skip loading and saving the snapshot cache
    #[arg(long = "no-cache")]
    pub no_cache: bool,

    /// Seconds to wait for in-flight fetches on shutdown
    #[arg(long, default_value = "2")]
    pub grace: u64,

    /// Disable ANSI colors in output
    #[arg(long = "no-color")]
    pub no_color: bool,
}

/// Run the watch command
pub async fn run(args: WatchArgs) -> anyhow::Result<()> {
    let settings = Settings::load();
    let admin_key = resolve_admin_key();
    let capabilities = Capabilities::resolve(admin_key.is_some());

    let sources: Vec<SourceId> = settings
        .enabled_source_ids()
        .into_iter()
        .filter(|id| {
            let ok = capabilities.supports(*id);
            if !ok {
                tracing::warn!(source = %id, "skipping source, admin API key not configured");
            }
            ok
        })
        .collect();
    if sources.is_empty() {
        anyhow::bail!("no sources available; enable sources or configure an admin API key");
    }

    let intervals: Vec<(SourceId, Duration)> = sources
        .iter()
        .map(|id| (*id, settings.interval_for(*id)))
        .collect();
    let aggregator = Arc::new(Aggregator::new(&intervals));

    let cache = (!args.no_cache)
        .then(SnapshotCache::at_default_location)
        .flatten();
    if let Some(cache) = &cache {
        if let Some(snapshot) = cache.load() {
            tracing::debug!("seeding from snapshot cache");
            aggregator.seed(&snapshot);
        }
    }

    let mut scheduler = Scheduler::new(aggregator.clone());
    for (id, interval) in &intervals {
        let fetcher = create_fetcher(*id, &settings, admin_key.as_deref())?;
        scheduler.start(fetcher, *interval);
    }

    let use_color = !args.no_color && is_terminal();
    let mut rx = aggregator.subscribe();
    let mut view = DashboardView::new(&sources, settings.holding_amount, use_color);
    view.update(&aggregator.snapshot());
    view.draw();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut marker_tick = tokio::time::interval(Duration::from_secs(MARKER_REFRESH_SECS));

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("shutting down");
                break;
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();
                if view.update(&snapshot) {
                    view.draw();
                }
            }
            _ = marker_tick.tick() => {
                // Freshness markers decay without new data arriving
                if view.update(&aggregator.snapshot()) {
                    view.draw();
                }
            }
        }
    }

    scheduler.shutdown(Duration::from_secs(args.grace)).await;

    if let Some(cache) = &cache {
        if let Err(e) = cache.save(&aggregator.snapshot()) {
            tracing::warn!(error = %e, "failed to save snapshot cache");
        }
    }

    Ok(())
}

/// Per-source rendered sections; only sections whose state changed are
/// re-rendered between draws
struct DashboardView {
    order: Vec<SourceId>,
    states: HashMap<SourceId, SourceState>,
    sections: HashMap<SourceId, String>,
    holding_amount: f64,
    use_color: bool,
}

impl DashboardView {
    fn new(sources: &[SourceId], holding_amount: f64, use_color: bool) -> Self {
        Self {
            order: sources.to_vec(),
            states: HashMap::new(),
            sections: HashMap::new(),
            holding_amount,
            use_color,
        }
    }

    /// Re-render sections for sources whose state or freshness changed.
    /// Returns whether anything visible changed.
    fn update(&mut self, snapshot: &AppSnapshot) -> bool {
        let now = Utc::now();
        let mut dirty = false;
        for id in &self.order {
            let Some(state) = snapshot.state(*id) else {
                continue;
            };
            let rendered = render::render_section(*id, state, now, self.holding_amount, self.use_color);
            let state_changed = self.states.get(id) != Some(state);
            let text_changed = self.sections.get(id) != Some(&rendered);
            if state_changed || text_changed {
                self.states.insert(*id, state.clone());
                self.sections.insert(*id, rendered);
                dirty = true;
            }
        }
        dirty
    }

    fn draw(&self) {
        let frame: Vec<&str> = self
            .order
            .iter()
            .filter_map(|id| self.sections.get(id).map(String::as_str))
            .collect();

        let mut stdout = std::io::stdout().lock();
        if self.use_color {
            let _ = write!(stdout, "\x1b[2J\x1b[H");
        }
        let _ = writeln!(stdout, "{}", frame.join("\n\n"));
        let _ = stdout.flush();
    }
}

/// Check if stdout is a terminal
fn is_terminal() -> bool {
    use std::io::IsTerminal;
    std::io::stdout().is_terminal()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FetchError, PriceSnapshot, SourcePayload};

    fn view_for(sources: &[SourceId]) -> DashboardView {
        DashboardView::new(sources, 0.0, false)
    }

    #[test]
    fn test_view_renders_only_changed_sections() {
        let intervals = [
            (SourceId::Price, Duration::from_secs(60)),
            (SourceId::Usage, Duration::from_secs(30)),
        ];
        let aggregator = Aggregator::new(&intervals);
        let mut view = view_for(&[SourceId::Price, SourceId::Usage]);

        assert!(view.update(&aggregator.snapshot()));
        let usage_before = view.sections[&SourceId::Usage].clone();

        aggregator.apply(
            SourceId::Price,
            Ok(SourcePayload::Price(PriceSnapshot::single("usd", 1.5))),
        );
        assert!(view.update(&aggregator.snapshot()));
        assert!(view.sections[&SourceId::Price].contains("$1.50"));
        assert_eq!(view.sections[&SourceId::Usage], usage_before);
    }

    #[test]
    fn test_view_never_succeeded_shows_no_data() {
        let intervals = [(SourceId::Usage, Duration::from_secs(30))];
        let aggregator = Aggregator::new(&intervals);
        aggregator.apply(
            SourceId::Usage,
            Err(FetchError::Network("connection refused".to_string())),
        );

        let mut view = view_for(&[SourceId::Usage]);
        view.update(&aggregator.snapshot());
        let section = &view.sections[&SourceId::Usage];
        assert!(section.contains("no data yet"));
        assert!(section.contains("connection refused"));
    }

    #[test]
    fn test_view_unchanged_snapshot_is_not_dirty() {
        let intervals = [(SourceId::Price, Duration::from_secs(60))];
        let aggregator = Aggregator::new(&intervals);
        aggregator.apply(
            SourceId::Price,
            Ok(SourcePayload::Price(PriceSnapshot::single("usd", 1.5))),
        );

        let mut view = view_for(&[SourceId::Price]);
        assert!(view.update(&aggregator.snapshot()));
        assert!(!view.update(&aggregator.snapshot()));
    }
}
