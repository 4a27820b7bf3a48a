//! Retry with exponential backoff for transient model failures.
//!
//! Only errors for which [`EmbeddingError::is_transient`] holds are retried.
//! Anything else is returned to the caller on the first occurrence.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{EmbeddingError, Result};

/// Retry policy: `max_retries` retries after the first attempt, waiting
/// `unit * base^n` before retry `n` (1-based).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff_base: f64,
    backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: 2.0,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the default backoff (2^n seconds).
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self::new(0)
    }

    /// Set the exponential base.
    pub fn with_backoff_base(mut self, base: f64) -> Self {
        self.backoff_base = base;
        self
    }

    /// Set the duration one backoff step is measured in.
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before the given retry (1-based). Saturates at `Duration::MAX`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let secs = self.backoff_unit.as_secs_f64() * self.backoff_base.max(1.0).powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// All delays this policy will wait through, in order.
    pub fn delays(&self) -> Vec<Duration> {
        (1..=self.max_retries).map(|n| self.delay_for(n)).collect()
    }

    /// Run `operation` until it succeeds, fails permanently, or the retry
    /// budget is spent.
    ///
    /// A `Retry-After` carried by the error raises the wait before the next
    /// attempt; it never shortens the backoff.
    ///
    /// Exhausting the budget yields [`EmbeddingError::EmbeddingUnavailable`]
    /// carrying the last transient error.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retry = 0;
        loop {
            match operation().await {
                Ok(value) => {
                    if retry > 0 {
                        debug!("{label} succeeded after {retry} retries");
                    }
                    return Ok(value);
                }
                Err(err) if !err.is_transient() => return Err(err),
                Err(err) if retry >= self.max_retries => {
                    warn!("{label} failed after {} attempts: {err}", retry + 1);
                    return Err(EmbeddingError::EmbeddingUnavailable {
                        attempts: retry + 1,
                        last_error: err.to_string(),
                    });
                }
                Err(err) => {
                    retry += 1;
                    let backoff = self.delay_for(retry);
                    let delay = err.retry_after().map_or(backoff, |wait| wait.max(backoff));
                    warn!(
                        "{label} failed with transient error ({err}), \
                         retry {retry}/{} in {delay:?}",
                        self.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
