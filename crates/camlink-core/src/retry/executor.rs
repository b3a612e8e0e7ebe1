//! Retry loop: run an async operation until success or the policy says stop.

use std::future::Future;
use std::sync::RwLock;

use thiserror::Error;
use tokio::time::sleep;

use crate::events::{EventBus, PipelineEvent};

use super::policy::{RetryDecision, RetryPolicy};

/// Terminal failure of an executed operation, wrapping the last attempt's error.
#[derive(Debug, Clone, Error)]
#[error("operation '{label}' failed after {attempts} attempt(s): {source}")]
pub struct OperationFailed<E>
where
    E: std::error::Error + 'static,
{
    pub label: String,
    pub attempts: u32,
    #[source]
    pub source: E,
}

impl<E: std::error::Error + 'static> OperationFailed<E> {
    /// The last attempt's error, discarding the retry envelope.
    pub fn into_inner(self) -> E {
        self.source
    }
}

/// Wraps arbitrary async operations with retry/backoff and lifecycle events.
///
/// Owns no shared state beyond its policy, which can be hot-swapped between
/// calls; an in-flight call keeps the policy snapshot captured at its start.
pub struct OperationExecutor {
    policy: RwLock<RetryPolicy>,
    events: EventBus,
}

impl OperationExecutor {
    pub fn new(policy: RetryPolicy, events: EventBus) -> Self {
        Self {
            policy: RwLock::new(policy),
            events,
        }
    }

    /// Replace the policy wholesale. Calls already in flight are unaffected.
    pub fn set_policy(&self, policy: RetryPolicy) {
        *self.policy.write().unwrap() = policy;
    }

    /// Snapshot of the current policy.
    pub fn policy(&self) -> RetryPolicy {
        self.policy.read().unwrap().clone()
    }

    /// Run `op` until it succeeds or the policy gives up.
    ///
    /// The attempt counter is 1-based; with `max_attempts = n` retries the
    /// operation runs at most `n + 1` times. Emits `RetryAttempt` before
    /// each backoff sleep, `RetrySucceeded` when a retried call recovers,
    /// and `RetryExhausted` when the final error is propagated.
    pub async fn execute<T, E, F, Fut>(
        &self,
        label: &str,
        context: Option<&str>,
        mut op: F,
    ) -> Result<T, OperationFailed<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + 'static,
    {
        let policy = self.policy();
        let mut attempt = 1u32;
        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        self.events.emit(PipelineEvent::RetrySucceeded {
                            label: label.to_string(),
                            attempt,
                            context: context.map(str::to_string),
                        });
                    }
                    return Ok(value);
                }
                Err(e) => {
                    let error_text = e.to_string();
                    match policy.decide(attempt, &error_text) {
                        RetryDecision::RetryAfter(delay) => {
                            tracing::warn!(
                                label,
                                attempt,
                                max_attempts = policy.max_attempts,
                                error = %error_text,
                                ?delay,
                                "retrying after failure"
                            );
                            self.events.emit(PipelineEvent::RetryAttempt {
                                label: label.to_string(),
                                attempt,
                                max_attempts: policy.max_attempts,
                                error: error_text,
                                delay,
                                context: context.map(str::to_string),
                            });
                            sleep(delay).await;
                            attempt += 1;
                        }
                        RetryDecision::NoRetry => {
                            self.events.emit(PipelineEvent::RetryExhausted {
                                label: label.to_string(),
                                attempt,
                                error: error_text,
                                context: context.map(str::to_string),
                            });
                            return Err(OperationFailed {
                                label: label.to_string(),
                                attempts: attempt,
                                source: e,
                            });
                        }
                    }
                }
            }
        }
    }
}
