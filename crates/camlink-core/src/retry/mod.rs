//! Retry and backoff policy.
//!
//! This module encapsulates error classification (signature matching
//! against the error text) and exponential backoff decisions so that the
//! request pipeline and the device session share a consistent policy.
//!
//! The attempt arithmetic is deliberate: `max_attempts` counts *retries*,
//! so an operation under a policy of `max_attempts = 3` runs up to 4
//! total tries.

mod classify;
mod executor;
mod policy;

pub use classify::{is_retryable, DEFAULT_RETRYABLE_SIGNATURES};
pub use executor::{OperationExecutor, OperationFailed};
pub use policy::{RetryDecision, RetryPolicy};
