//! Per-source polling workers
//!
//! One task per started source: tick on a fixed interval, fetch with the
//! retry policy, hand the result to the aggregator. Fetches for one source
//! run strictly serially; a tick that lands while a fetch is in flight is
//! skipped rather than queued. Stopping a worker abandons any in-flight
//! fetch without applying its result.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{fetch_with_retry, Aggregator, RetryPolicy, SourceFetcher, SourceId};

struct Worker {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Owns the polling lifecycle for all sources.
///
/// Instances are independent: tests can run several schedulers side by side
/// against separate aggregators.
pub struct Scheduler {
    aggregator: Arc<Aggregator>,
    retry: RetryPolicy,
    workers: HashMap<SourceId, Worker>,
}

impl Scheduler {
    pub fn new(aggregator: Arc<Aggregator>) -> Self {
        Self {
            aggregator,
            retry: RetryPolicy::default(),
            workers: HashMap::new(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Whether a worker is running for this source
    pub fn is_running(&self, source: SourceId) -> bool {
        self.workers.contains_key(&source)
    }

    /// Sources with a running worker
    pub fn running_sources(&self) -> Vec<SourceId> {
        let mut sources: Vec<_> = self.workers.keys().copied().collect();
        sources.sort();
        sources
    }

    /// Start polling a source at `interval`. The first fetch is dispatched
    /// immediately. Starting an already-running source is a no-op.
    pub fn start(&mut self, fetcher: Arc<dyn SourceFetcher>, interval: Duration) {
        let source = fetcher.id();
        if self.workers.contains_key(&source) {
            tracing::warn!(source = %source, "worker already running, ignoring start");
            return;
        }

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let aggregator = Arc::clone(&self.aggregator);
        let retry = self.retry;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // At-most-one in-flight fetch per source: ticks that land while a
            // fetch is running are dropped, not queued.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown_rx.changed() => break,
                }

                tokio::select! {
                    result = fetch_with_retry(fetcher.as_ref(), retry) => {
                        aggregator.apply(source, result);
                    }
                    // Abandon the in-flight fetch; its result must never
                    // reach a torn-down aggregator.
                    _ = shutdown_rx.changed() => break,
                }
            }
            tracing::debug!(source = %source, "worker stopped");
        });

        tracing::info!(source = %source, interval_secs = interval.as_secs(), "worker started");
        self.workers.insert(
            source,
            Worker {
                shutdown: shutdown_tx,
                handle,
            },
        );
    }

    /// Stop one source, waiting up to `grace` before abandoning the worker
    pub async fn stop(&mut self, source: SourceId, grace: Duration) {
        if let Some(worker) = self.workers.remove(&source) {
            Self::wind_down(source, worker, grace).await;
        }
    }

    /// Stop all workers: signal everyone first, then await each up to `grace`
    pub async fn shutdown(&mut self, grace: Duration) {
        let workers: Vec<_> = self.workers.drain().collect();
        for (_, worker) in &workers {
            let _ = worker.shutdown.send(true);
        }
        for (source, worker) in workers {
            Self::wind_down(source, worker, grace).await;
        }
        tracing::info!("scheduler shut down");
    }

    async fn wind_down(source: SourceId, worker: Worker, grace: Duration) {
        let _ = worker.shutdown.send(true);
        let mut handle = worker.handle;
        if tokio::time::timeout(grace, &mut handle).await.is_err() {
            tracing::warn!(source = %source, "worker did not stop within grace period, aborting");
            handle.abort();
        }
    }
}
