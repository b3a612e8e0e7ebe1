//! Concurrency-limited, deduplicating, priority-aware request dispatcher.
//!
//! Every dispatched call is wrapped by the transport-level
//! `OperationExecutor` (its retry count is independent of the device-level
//! policy) and bounded by a per-call timeout. Identical in-flight calls
//! collapse onto one transport call; a counting semaphore with FIFO wake
//! order enforces the concurrency ceiling on normal-priority calls.

mod batch;
mod inflight;
mod key;

use std::time::Duration;

use tokio::sync::Semaphore;

use crate::config::PipelineConfig;
use crate::error::CallError;
use crate::events::EventBus;
use crate::retry::{OperationExecutor, OperationFailed, RetryPolicy};

use inflight::{InflightMap, Joined};

pub use reqwest::Method;

/// Scheduling class for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    #[default]
    Normal,
    /// Bypasses the concurrency ceiling; the caller accepts contention
    /// risk for latency-sensitive operations (status checks, shutter).
    High,
}

/// Per-request options. `timeout` overrides the pipeline default.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<serde_json::Value>,
    pub priority: Priority,
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post(body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            body: Some(body),
            ..Self::default()
        }
    }

    pub fn delete() -> Self {
        Self {
            method: Method::DELETE,
            ..Self::default()
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Settled response shared by all deduplicated callers.
#[derive(Debug, Clone)]
pub struct PipelineResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl PipelineResponse {
    /// Decode the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, CallError> {
        serde_json::from_slice(&self.body).map_err(|e| CallError::Decode(e.to_string()))
    }
}

pub(crate) type CallResult = Result<PipelineResponse, CallError>;

/// The dispatcher. Construct one per device endpoint and share via `Arc`;
/// nothing here is process-global.
pub struct RequestPipeline {
    client: reqwest::Client,
    slots: Semaphore,
    inflight: InflightMap,
    executor: OperationExecutor,
    timeout: Duration,
    batcher: batch::Batcher,
}

impl RequestPipeline {
    /// Build from the `[pipeline]` config section. The transport retry
    /// policy keeps the signature set from `RetryPolicy::default()` but
    /// uses the pipeline's own (shorter) retry count and delays.
    pub fn new(cfg: &PipelineConfig, events: EventBus) -> Self {
        let transport_policy = RetryPolicy {
            max_attempts: cfg.request_retries,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            ..RetryPolicy::default()
        };
        Self {
            client: reqwest::Client::new(),
            slots: Semaphore::new(cfg.max_concurrent.max(1)),
            inflight: InflightMap::default(),
            executor: OperationExecutor::new(transport_policy, events),
            timeout: Duration::from_secs(cfg.request_timeout_secs),
            batcher: batch::Batcher::new(Duration::from_millis(cfg.batch_window_ms)),
        }
    }

    /// Issue a request, deduplicating against identical in-flight calls.
    ///
    /// The canonical key is method + url + serialized body; all callers
    /// sharing a key observe the same settled outcome, success or failure.
    /// After settlement the key is free again and a later identical call
    /// issues a fresh request.
    pub async fn request(&self, url: &str, options: RequestOptions) -> CallResult {
        let key = key::canonical_key(&options.method, url, options.body.as_ref());
        match self.inflight.join(&key) {
            Joined::Follower(rx) => rx
                .await
                .map_err(|_| CallError::Transport("deduplicated request dropped".to_string()))?,
            Joined::Leader(pledge) => {
                // If this future is dropped mid-dispatch the pledge fails
                // the waiters and frees the key on the way out.
                let result = self.dispatch(url, &options).await;
                pledge.settle(&result);
                result
            }
        }
    }

    /// `request` at high priority: never queued behind the ceiling.
    pub async fn priority_request(&self, url: &str, options: RequestOptions) -> CallResult {
        self.request(url, options.with_priority(Priority::High)).await
    }

    async fn dispatch(&self, url: &str, options: &RequestOptions) -> CallResult {
        let _permit = match options.priority {
            Priority::High => None,
            Priority::Normal => Some(
                self.slots
                    .acquire()
                    .await
                    .map_err(|_| CallError::Transport("request slots closed".to_string()))?,
            ),
        };
        let label = format!("{} {}", options.method, url);
        self.executor
            .execute(&label, None, || self.perform(url, options))
            .await
            .map_err(OperationFailed::into_inner)
    }

    /// One transport attempt: timeout-bounded send, non-2xx mapped to
    /// `CallError::Status` so the classifier can see "HTTP 5xx".
    async fn perform(&self, url: &str, options: &RequestOptions) -> CallResult {
        let deadline = options.timeout.unwrap_or(self.timeout);
        let mut req = self
            .client
            .request(options.method.clone(), url)
            .timeout(deadline);
        if let Some(body) = &options.body {
            req = req.json(body);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| CallError::from_reqwest(e, deadline))?;
        let status = resp.status().as_u16();
        let body = resp
            .bytes()
            .await
            .map_err(|e| CallError::from_reqwest(e, deadline))?;
        if !(200..300).contains(&status) {
            return Err(CallError::Status(status));
        }
        Ok(PipelineResponse {
            status,
            body: body.to_vec(),
        })
    }
}
