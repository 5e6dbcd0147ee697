//! Retry policy for feed downloads.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{FeedError, Result};

/// Retry configuration for failed feed requests
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try
    pub max_retries: u32,

    /// Initial backoff duration
    pub initial_backoff: Duration,

    /// Maximum backoff duration
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    /// Calculate backoff for a given attempt (0-based): doubles each time,
    /// capped at `max_backoff`.
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let backoff = self.initial_backoff.as_millis() as u64 * 2u64.pow(attempt);
        let max = self.max_backoff.as_millis() as u64;
        Duration::from_millis(backoff.min(max))
    }
}

/// Run a fallible async operation under a retry policy.
///
/// Every error counts as retryable. After the final attempt the last error
/// is wrapped in [`FeedError::Fetch`] with the feed's name.
pub async fn with_retries<T, F, Fut>(
    config: &RetryConfig,
    source: &str,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < config.max_retries => {
                let backoff = config.backoff_for(attempt);
                warn!(
                    feed = %source,
                    attempt = attempt + 1,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "feed fetch failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(err) => {
                return Err(FeedError::Fetch {
                    feed: source.to_string(),
                    reason: err.to_string(),
                })
            }
        }
    }
}
