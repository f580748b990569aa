//! Bounded retry with exponential backoff for outbound provider calls
//!
//! Wraps connection establishment and the header/status phase only; an
//! established stream is never retried, so a retry can never duplicate
//! consumed body bytes.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::error::LlmError;

/// Attempts per logical call, first try included
const DEFAULT_MAX_ATTEMPTS: u32 = 4;

/// Initial backoff delay
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Ceiling for a single backoff delay
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Overall deadline for one logical call, attempts and backoff included
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(180);

/// Retry pipeline settings
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts per logical call, first try included
    pub max_attempts: u32,
    /// Initial backoff delay
    pub base_delay: Duration,
    /// Ceiling for a single backoff delay
    pub max_delay: Duration,
    /// Exponential backoff multiplier
    pub multiplier: f64,
    /// Overall deadline for one logical call
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            multiplier: 2.0,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    /// Build a policy from configuration
    pub fn from_config(config: &axon_config::RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            multiplier: config.multiplier,
            call_timeout: Duration::from_secs(config.call_timeout_secs),
        }
    }

    /// Backoff delay for a zero-based attempt, with jitter
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponential = self.base_delay.as_millis() as f64 * self.multiplier.powi(attempt.min(16) as i32);
        let capped = exponential.min(self.max_delay.as_millis() as f64);
        let jittered = capped * rand::rng().random_range(0.8..1.2);
        Duration::from_millis(jittered as u64)
    }

    /// Run an operation with retry, honoring cancellation, `Retry-After`
    /// hints, and the overall call deadline
    ///
    /// # Errors
    ///
    /// Returns the last operation error once attempts are exhausted or the
    /// error is not retryable, `LlmError::Timeout` when the overall deadline
    /// elapses, and `LlmError::Cancelled` when the context is cancelled.
    pub async fn run<T, F, Fut>(&self, cancel: &CancellationToken, mut op: F) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let attempts = async {
            let mut attempt = 0;
            loop {
                match op().await {
                    Ok(value) => return Ok(value),
                    Err(e) => {
                        attempt += 1;
                        if !e.is_retryable() || attempt >= self.max_attempts {
                            return Err(e);
                        }

                        // A provider hint replaces the computed backoff
                        let delay = e.retry_after().unwrap_or_else(|| self.delay_for_attempt(attempt - 1));
                        tracing::warn!(
                            attempt,
                            max_attempts = self.max_attempts,
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            error = %e,
                            "retrying provider call"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        };

        match cancel
            .run_until_cancelled(tokio::time::timeout(self.call_timeout, attempts))
            .await
        {
            None => Err(LlmError::Cancelled),
            Some(Err(_)) => Err(LlmError::Timeout(self.call_timeout)),
            Some(Ok(result)) => result,
        }
    }
}
