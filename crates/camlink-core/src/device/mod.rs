//! Camera connection state machine.
//!
//! `Disconnected -> Connecting -> Connected -> Disconnected`; a session
//! exists only after a successful info probe. Every device call funnels
//! through `api_call`, which fails fast when not connected, applies the
//! per-call timeout, and wraps the request in the device-level retry
//! executor (on top of the pipeline's own transport retries).

mod api;

pub use api::{ArtifactDescriptor, DeviceInfo, ListingResponse};

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use url::Url;

use crate::config::DeviceConfig;
use crate::error::CallError;
use crate::events::{EventBus, PipelineEvent};
use crate::pipeline::{Priority, RequestOptions, RequestPipeline};
use crate::retry::{OperationExecutor, OperationFailed, RetryPolicy};

/// How the current session reaches the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Explicit wireless address.
    Wireless,
    /// Loopback candidate (USB/tether bridge exposing a local HTTP port).
    Local,
}

#[derive(Debug, Clone)]
enum SessionState {
    Disconnected,
    Connecting,
    Connected {
        base: Url,
        transport: TransportKind,
        info: DeviceInfo,
    },
}

/// Point-in-time session snapshot for status callers.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub connected: bool,
    pub transport: Option<TransportKind>,
    pub info: Option<DeviceInfo>,
}

/// One camera session. Exclusively owned by the orchestrator that created
/// it; constructed explicitly (no process-wide instance).
pub struct DeviceSession {
    pipeline: Arc<RequestPipeline>,
    executor: OperationExecutor,
    cfg: DeviceConfig,
    state: Mutex<SessionState>,
    events: EventBus,
}

impl DeviceSession {
    pub fn new(
        cfg: DeviceConfig,
        policy: RetryPolicy,
        pipeline: Arc<RequestPipeline>,
        events: EventBus,
    ) -> Self {
        Self {
            pipeline,
            executor: OperationExecutor::new(policy, events.clone()),
            cfg,
            state: Mutex::new(SessionState::Disconnected),
            events,
        }
    }

    fn control_timeout(&self) -> Duration {
        Duration::from_secs(self.cfg.control_timeout_secs)
    }

    fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.cfg.download_timeout_secs)
    }

    /// Delay after a shutter call before the device has finished writing
    /// the new file.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.cfg.settle_delay_ms)
    }

    /// Single wireless attempt at an explicit address. Returns true iff
    /// the info probe parsed; on failure the session stays `Disconnected`.
    pub async fn connect(&self, address: &str, port: u16) -> bool {
        self.set_state(SessionState::Connecting);
        match self.probe(address, port, TransportKind::Wireless).await {
            Some(()) => true,
            None => {
                self.set_state(SessionState::Disconnected);
                false
            }
        }
    }

    /// Try the ordered loopback candidates, stopping at first success.
    pub async fn connect_local(&self) -> bool {
        self.set_state(SessionState::Connecting);
        for candidate in &self.cfg.local_candidates {
            let Some((host, port)) = split_candidate(candidate) else {
                tracing::warn!(candidate, "skipping malformed local candidate");
                continue;
            };
            if self.probe(&host, port, TransportKind::Local).await.is_some() {
                return true;
            }
        }
        self.set_state(SessionState::Disconnected);
        false
    }

    /// Info probe against one candidate; on success stores the session
    /// state and emits `Connected`.
    async fn probe(&self, host: &str, port: u16, transport: TransportKind) -> Option<()> {
        let base = Url::parse(&format!("http://{}:{}/", host, port)).ok()?;
        let url = base.join(&self.cfg.info_path).ok()?;
        let options = RequestOptions::get().with_timeout(self.control_timeout());
        let label = format!("probe {}:{}", host, port);
        let response = self
            .executor
            .execute(&label, None, || self.pipeline.request(url.as_str(), options.clone()))
            .await
            .ok()?;
        let info: DeviceInfo = response.json().ok()?;
        tracing::info!(host, port, name = %info.name, "device connected");
        self.set_state(SessionState::Connected {
            base,
            transport,
            info: info.clone(),
        });
        self.events.emit(PipelineEvent::Connected { info, transport });
        Some(())
    }

    /// Always succeeds: clears address state and emits `Disconnected`.
    /// Outstanding calls are not cancelled; they fail naturally against
    /// the stale address.
    pub fn disconnect(&self) {
        self.set_state(SessionState::Disconnected);
        self.events.emit(PipelineEvent::Disconnected);
    }

    pub fn is_connected(&self) -> bool {
        matches!(*self.state.lock().unwrap(), SessionState::Connected { .. })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        match &*self.state.lock().unwrap() {
            SessionState::Connected { transport, info, .. } => SessionSnapshot {
                connected: true,
                transport: Some(*transport),
                info: Some(info.clone()),
            },
            _ => SessionSnapshot {
                connected: false,
                transport: None,
                info: None,
            },
        }
    }

    fn set_state(&self, next: SessionState) {
        *self.state.lock().unwrap() = next;
    }

    fn connected_base(&self) -> Result<Url, CallError> {
        match &*self.state.lock().unwrap() {
            SessionState::Connected { base, .. } => Ok(base.clone()),
            _ => Err(CallError::NotConnected),
        }
    }

    /// The single funnel for device calls: requires `Connected`, resolves
    /// relative endpoints against the session base, defaults the control
    /// timeout, and retries per the device policy.
    pub async fn api_call(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<crate::pipeline::PipelineResponse, CallError> {
        let base = self.connected_base()?;
        let url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            base.join(endpoint)
                .map_err(|e| CallError::Decode(format!("bad endpoint {}: {}", endpoint, e)))?
                .into()
        };
        let options = if options.timeout.is_none() {
            options.with_timeout(self.control_timeout())
        } else {
            options
        };
        let label = format!("{} {}", options.method, endpoint);
        self.executor
            .execute(&label, None, || self.pipeline.request(&url, options.clone()))
            .await
            .map_err(OperationFailed::into_inner)
    }

    /// Re-fetch the device identity over the live session.
    pub async fn device_info(&self) -> Result<DeviceInfo, CallError> {
        self.api_call(&self.cfg.info_path, RequestOptions::get())
            .await?
            .json()
    }

    /// Vendor-defined runtime status object, passed through untyped.
    pub async fn device_status(&self) -> Result<serde_json::Value, CallError> {
        self.api_call(&self.cfg.status_path, RequestOptions::get())
            .await?
            .json()
    }

    /// Trigger capture. High priority: a shutter press should never queue
    /// behind background transfers.
    pub async fn trigger_shutter(&self, af: bool) -> Result<(), CallError> {
        self.api_call(
            &self.cfg.shutter_path,
            RequestOptions::post(json!({ "af": af })).with_priority(Priority::High),
        )
        .await?;
        Ok(())
    }

    /// Full remote artifact listing, in device order.
    pub async fn list_artifacts(&self) -> Result<Vec<ArtifactDescriptor>, CallError> {
        let listing: ListingResponse = self
            .api_call(&self.cfg.listing_path, RequestOptions::get())
            .await?
            .json()?;
        Ok(listing.url)
    }

    /// Raw artifact bytes; uses the longer binary-download timeout.
    pub async fn download_artifact(&self, artifact_url: &str) -> Result<Vec<u8>, CallError> {
        let response = self
            .api_call(
                artifact_url,
                RequestOptions::get().with_timeout(self.download_timeout()),
            )
            .await?;
        Ok(response.body)
    }

    /// Remove an artifact from the device.
    pub async fn delete_artifact(&self, artifact_url: &str) -> Result<(), CallError> {
        self.api_call(artifact_url, RequestOptions::delete()).await?;
        Ok(())
    }
}

fn split_candidate(candidate: &str) -> Option<(String, u16)> {
    let (host, port) = candidate.rsplit_once(':')?;
    Some((host.to_string(), port.parse().ok()?))
}
