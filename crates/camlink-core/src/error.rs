//! Call error taxonomy for pipeline and device requests.
//!
//! `CallError` is `Clone` so deduplicated callers waiting on the same
//! in-flight request can all receive the settled failure. Classification
//! for retries happens by signature match against the `Display` text
//! (see `retry::classify`), so the messages here deliberately carry the
//! transport-level wording ("connection", "timed out", "HTTP 503").

use std::time::Duration;
use thiserror::Error;

/// Error for a single HTTP call against the device or pipeline.
#[derive(Debug, Clone, Error)]
pub enum CallError {
    /// Network-level failure below HTTP (refused, reset, DNS, broken pipe).
    #[error("connection failed: {0}")]
    Transport(String),
    /// The call hit its per-call deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// Non-2xx HTTP status from the device.
    #[error("HTTP {0}")]
    Status(u16),
    /// A device call was issued without a connected session.
    #[error("device not connected")]
    NotConnected,
    /// Response body was not the expected shape.
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl CallError {
    /// Map a reqwest failure, folding its timeout shape into `Timeout`
    /// so the signature classifier sees "timed out" regardless of how
    /// deep in the hyper stack the deadline fired.
    pub(crate) fn from_reqwest(e: reqwest::Error, deadline: Duration) -> Self {
        if e.is_timeout() {
            CallError::Timeout(deadline)
        } else {
            CallError::Transport(e.to_string())
        }
    }

    /// HTTP status code, if this error carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            CallError::Status(code) => Some(*code),
            _ => None,
        }
    }
}
