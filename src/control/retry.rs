//! Retry Policy - Capped Exponential Backoff
//!
//! Stateless wrapper for any fallible async operation. The delay before
//! attempt `n+1` is `min(base_delay * backoff_factor^(n-1), max_delay)`;
//! the final error propagates verbatim to the caller.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::error::{Error, Result};

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first (values below 1 behave as 1)
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub base_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    /// Multiplier applied per failed attempt
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff_factor: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Run `operation`, retrying every failure until attempts run out
    pub async fn execute<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.execute_if(operation, |_| true).await
    }

    /// Run `operation`, retrying only failures for which `should_retry`
    /// returns true. A non-retryable or final-attempt error is returned
    /// as-is.
    pub async fn execute_if<T, F, Fut, P>(&self, mut operation: F, should_retry: P) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        P: Fn(&Error) -> bool,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if attempt < max_attempts && should_retry(&error) => {
                    let delay = self.delay_for(attempt);
                    warn!(attempt, delay_ms = delay.as_millis() as u64, %error, "attempt failed, retrying");
                    sleep(delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Backoff delay after the given failed attempt (1-based). Computed in
    /// float seconds and clamped before the `Duration` is built, so an
    /// overflowing or non-finite product saturates at `max_delay` rather
    /// than panicking.
    fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = self.backoff_factor.powi(attempt.saturating_sub(1) as i32);
        let seconds = (self.base_delay.as_secs_f64() * exponent)
            .min(self.max_delay.as_secs_f64())
            .max(0.0);
        Duration::from_secs_f64(seconds)
    }
}

// =============================================================================
// Tests
// =============================================================================
