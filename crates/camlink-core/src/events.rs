//! Pipeline outcome events and the bus they fan out on.
//!
//! The orchestrator and executor publish outcomes here without knowing
//! their consumers; logging, the CLI, and tests subscribe independently.
//! Built on `tokio::sync::broadcast` so a slow subscriber lags (and drops
//! old events) instead of backpressuring the transfer loop.

use std::time::Duration;
use tokio::sync::broadcast;

use crate::device::{DeviceInfo, TransportKind};

/// Everything the pipeline reports about itself.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// A retryable failure; the executor will try again after `delay`.
    RetryAttempt {
        label: String,
        attempt: u32,
        max_attempts: u32,
        error: String,
        delay: Duration,
        context: Option<String>,
    },
    /// An operation succeeded after at least one retry.
    RetrySucceeded {
        label: String,
        attempt: u32,
        context: Option<String>,
    },
    /// Retries exhausted (or the error was fatal); the operation failed.
    RetryExhausted {
        label: String,
        attempt: u32,
        error: String,
        context: Option<String>,
    },
    /// A device session was established.
    Connected {
        info: DeviceInfo,
        transport: TransportKind,
    },
    /// The device session ended.
    Disconnected,
    /// A manual capture was triggered successfully.
    PictureTaken,
    /// One artifact was downloaded, transformed, and persisted.
    ArtifactTransferred { name: String, record_id: String },
    /// Downloading one artifact failed; only that item is affected.
    DownloadFailed { name: String, error: String },
    /// Transform or persistence failed for one artifact; no delete follows.
    ProcessingFailed { name: String, error: String },
    /// Best-effort remote delete failed; the persisted copy is kept.
    DeleteFailed { name: String, error: String },
    /// A tick-level failure (e.g. the listing fetch itself).
    TransferError { error: String },
}

/// Broadcast bus for pipeline events. Cheap to clone; emitting with no
/// subscribers is not an error.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: PipelineEvent) {
        tracing::debug!(?event, "pipeline event");
        // Err means no live subscribers; outcomes are fire-and-forget.
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
