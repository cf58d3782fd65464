//! Bounded retry with backoff
//!
//! Both playlist reads (racing an external writer) and reconciliation
//! transactions (racing the media player's own connection) retry through
//! this one policy type. Every loop is bounded by `max_attempts`.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry policy: attempt count plus a (possibly growing) delay between attempts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (at least 1)
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Factor applied to the delay after each retry
    pub multiplier: f64,
    /// Cap for the grown delay
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Same delay between every attempt
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay: delay,
            multiplier: 1.0,
            max_delay: delay,
        }
    }

    /// Delay doubles after each retry, capped at `max_delay`
    pub fn exponential(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            multiplier: 2.0,
            max_delay,
        }
    }

    /// A single attempt, no retries
    pub fn none() -> Self {
        Self::fixed(1, Duration::ZERO)
    }

    /// Delay to wait after the `retry`-th failed attempt (zero-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(retry as i32);
        let delay = self.initial_delay.as_secs_f64() * factor;
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out
    ///
    /// `is_transient` decides whether a failure is worth another attempt.
    /// The last error is returned unchanged.
    pub async fn run<T, E, F, Fut>(
        &self,
        operation: &str,
        is_transient: impl Fn(&E) -> bool,
        mut op: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} succeeded on attempt {}/{}", operation, attempt, max_attempts);
                    }
                    return Ok(value);
                }
                Err(e) if attempt < max_attempts && is_transient(&e) => {
                    let delay = self.delay_for(attempt - 1);
                    warn!(
                        "{} failed (attempt {}/{}), retrying in {:?}: {}",
                        operation, attempt, max_attempts, delay, e
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
        Self::fixed(4, Duration::from_millis(500))
    }
}
