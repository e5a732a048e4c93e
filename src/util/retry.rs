//! Retry with exponential backoff, jitter and cooperative cancellation.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::RillError;

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Execute an async operation with retry.
    ///
    /// Each attempt and each backoff wait races `cancel`; cancellation ends the
    /// loop with [`RillError::Cancelled`]. Non-retryable errors are returned as-is.
    pub async fn execute<F, Fut, T>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, RillError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RillError>>,
    {
        let mut backoff = self.initial_backoff;
        let mut last_error = None;

        for attempt in 0..self.max_attempts {
            if cancel.is_cancelled() {
                return Err(RillError::Cancelled);
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RillError::Cancelled),
                outcome = operation() => outcome,
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !e.is_retryable() || attempt + 1 >= self.max_attempts {
                        return Err(e);
                    }

                    let delay = self.delay_for(backoff, &e);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying after error"
                    );

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(RillError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }

                    backoff = Duration::from_secs_f64(
                        (backoff.as_secs_f64() * self.multiplier)
                            .min(self.max_backoff.as_secs_f64()),
                    );

                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| RillError::Timeout(0)))
    }

    /// Jittered backoff (75%–125%), floored by a server-provided retry-after hint.
    fn delay_for(&self, backoff: Duration, error: &RillError) -> Duration {
        let jitter_factor = 0.75 + fastrand::f64() * 0.5;
        let jittered = Duration::from_secs_f64(backoff.as_secs_f64() * jitter_factor);
        match error {
            RillError::RateLimited {
                retry_after_ms: Some(ms),
            } => jittered.max(Duration::from_millis(*ms)),
            _ => jittered,
        }
    }
}
