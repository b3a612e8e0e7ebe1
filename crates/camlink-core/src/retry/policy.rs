//! Backoff policy: bounded exponential delays and the retry decision.

use std::time::Duration;

use super::classify;

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Exponential backoff policy with a delay ceiling and a signature set
/// for classifying which failures are worth retrying.
///
/// Replaceable wholesale on an executor (`OperationExecutor::set_policy`);
/// never merged field-by-field.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of *retries* (total tries = `max_attempts + 1`).
    pub max_attempts: u32,
    /// Base delay for backoff.
    pub base_delay: Duration,
    /// Upper bound on backoff delay.
    pub max_delay: Duration,
    /// Backoff multiplier (>= 1.0).
    pub backoff_multiplier: f64,
    /// Case-insensitive substring patterns marking an error retryable.
    pub retryable_signatures: Vec<String>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            retryable_signatures: classify::DEFAULT_RETRYABLE_SIGNATURES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl RetryPolicy {
    /// Backoff delay for a 1-based attempt number:
    /// `min(base * multiplier^(attempt-1), max_delay)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = self.backoff_multiplier.max(1.0).powi(attempt.saturating_sub(1) as i32);
        let raw = self.base_delay.as_secs_f64() * exp;
        if !raw.is_finite() || raw >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(raw)
        }
    }

    /// Decide whether the failure of the given 1-based attempt should be
    /// retried. Retries happen while `attempt <= max_attempts` and the
    /// error text matches a retryable signature.
    pub fn decide(&self, attempt: u32, error_text: &str) -> RetryDecision {
        if attempt > self.max_attempts {
            return RetryDecision::NoRetry;
        }
        if !classify::is_retryable(&self.retryable_signatures, error_text) {
            return RetryDecision::NoRetry;
        }
        RetryDecision::RetryAfter(self.backoff_delay(attempt))
    }
}
