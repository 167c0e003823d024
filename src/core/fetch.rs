//! Fetcher trait, fetch error taxonomy and retry policy
//!
//! Every failure mode of a fetch collapses into a classified [`FetchError`].
//! Transient kinds (network, timeout) are retried with exponential backoff;
//! auth and parse failures fail fast.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use super::{SourceId, SourcePayload};

/// Errors that can occur when fetching source data
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Timed out after {0} seconds")]
    Timeout(u64),
}

impl FetchError {
    /// Whether this error is worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Network(_) | FetchError::Timeout(_))
    }

    /// Short kind label for logs and rendered error states
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "network",
            FetchError::Auth(_) => "auth",
            FetchError::Parse(_) => "parse",
            FetchError::Timeout(_) => "timeout",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout(0)
        } else if e.is_decode() {
            FetchError::Parse(e.to_string())
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

/// Result of one fetch attempt against a source
pub type FetchResult = Result<SourcePayload, FetchError>;

/// Trait implemented by every data source fetcher.
///
/// A fetcher performs one request-response cycle and must not panic outward;
/// all failures are classified into [`FetchError`].
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// The source this fetcher serves
    fn id(&self) -> SourceId;

    /// Perform one fetch
    async fn fetch(&self) -> FetchResult;
}

/// Retry policy for transient fetch failures
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first (minimum 1)
    pub max_attempts: u32,
    /// Delay before the first retry; doubles each attempt
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Backoff delay before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Run one fetch with bounded retries.
///
/// Only transient errors are retried; auth and parse errors are returned
/// immediately. The last error wins when all attempts fail.
pub async fn fetch_with_retry(fetcher: &dyn SourceFetcher, policy: RetryPolicy) -> FetchResult {
    let attempts = policy.max_attempts.max(1);
    let mut last_err = None;

    for attempt in 1..=attempts {
        match fetcher.fetch().await {
            Ok(payload) => return Ok(payload),
            Err(e) if e.is_transient() && attempt < attempts => {
                let delay = policy.delay_for(attempt);
                tracing::debug!(
                    source = %fetcher.id(),
                    kind = e.kind(),
                    attempt,
                    "fetch failed, retrying in {:?}: {}",
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
                last_err = Some(e);
            }
            Err(e) => {
                if !e.is_transient() {
                    tracing::debug!(source = %fetcher.id(), kind = e.kind(), "fetch failed, not retryable: {}", e);
                }
                return Err(e);
            }
        }
    }

    // Unreachable while attempts >= 1, kept for totality
    Err(last_err.unwrap_or_else(|| FetchError::Network("no attempts made".to_string())))
}
