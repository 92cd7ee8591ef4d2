//! Timeout and exponential backoff for embedding calls.

use crate::config::EmbeddingSettings;
use crate::error::{PolicyRagError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How callers of an [`Embedder`](super::Embedder) recover from transient failures.
///
/// Every attempt is bounded by `timeout`; a timed-out attempt counts as a
/// retryable [`PolicyRagError::EmbeddingService`] error. Retryable errors are
/// retried up to `max_retries` times, sleeping `base_delay * 2^attempt`
/// (capped at `max_delay`) in between.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub timeout: Duration,
}

impl RetryPolicy {
    /// Single attempt with the given timeout.
    pub fn no_retries(timeout: Duration) -> Self {
        Self {
            max_retries: 0,
            timeout,
            ..Self::default()
        }
    }

    pub fn from_settings(settings: &EmbeddingSettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            timeout: Duration::from_secs(settings.timeout_seconds),
        }
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Run `operation` under this policy.
    pub async fn run<T, F, Fut>(&self, what: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            let outcome = match tokio::time::timeout(self.timeout, operation()).await {
                Ok(result) => result,
                Err(_) => Err(PolicyRagError::embedding(format!(
                    "{} timed out after {:?}",
                    what, self.timeout
                ))),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "{} failed (attempt {}/{}), retrying in {:?}: {}",
                        what,
                        attempt + 1,
                        self.max_retries + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            timeout: Duration::from_secs(30),
        }
    }
}
