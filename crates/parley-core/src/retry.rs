//! Retry with exponential backoff for provider HTTP calls.
//!
//! Both the chat and speech-to-text clients retry transient failures with the
//! same shape: a fixed number of total attempts and a doubling wait clamped to
//! `[min_delay, max_delay]`.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// How often and how patiently to retry.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero is treated as one.
    pub max_attempts: u32,
    /// Wait after the first failed attempt.
    pub min_delay: Duration,
    /// Upper bound on any single wait.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, min_secs: f64, max_secs: f64) -> Self {
        let min_delay = Duration::from_secs_f64(min_secs.max(0.0));
        let max_delay = Duration::from_secs_f64(max_secs.max(0.0)).max(min_delay);
        Self {
            max_attempts,
            min_delay,
            max_delay,
        }
    }

    /// Wait before the attempt following failed attempt number `attempt` (1-based):
    /// `min_delay * 2^(attempt-1)`, clamped to `[min_delay, max_delay]`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        self.min_delay
            .saturating_mul(2u32.saturating_pow(exp))
            .clamp(self.min_delay, self.max_delay)
    }
}

/// Outcome of [`retry`]: the value plus how many retries it took.
#[derive(Debug, Clone, PartialEq)]
pub struct Retried<T> {
    pub value: T,
    pub retries: u32,
}

/// Run `op` until it succeeds, returns a non-retryable error, or attempts run out.
///
/// The closure receives the 1-based attempt number. On a retryable failure a
/// warning naming `label` and the next attempt is logged before sleeping.
/// The error of the last attempt is returned together with the retry count.
pub async fn retry<T, E, F, Fut, R>(
    policy: &RetryPolicy,
    label: &str,
    is_retryable: R,
    mut op: F,
) -> Result<Retried<T>, (E, u32)>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => {
                return Ok(Retried {
                    value,
                    retries: attempt - 1,
                });
            }
            Err(err) if attempt < max_attempts && is_retryable(&err) => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    error = %err,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying {label} request, attempt {}",
                    attempt + 1
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err((err, attempt - 1)),
        }
    }
}
