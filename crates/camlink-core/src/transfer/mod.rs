//! Transfer orchestrator: keeps the device's artifact listing and the
//! local store eventually consistent, one artifact at a time, with
//! at-least-once semantics.
//!
//! Built on `DeviceSession` for the remote side and `AdaptivePoller` for
//! cadence. Per-item failures never escape a tick; the orchestrator
//! reports all background outcomes through the event bus only.

mod folder;
mod tick;

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tokio::time::sleep;

use crate::config::{CamlinkConfig, TransferConfig};
use crate::device::{ArtifactDescriptor, DeviceSession, SessionSnapshot};
use crate::events::{EventBus, PipelineEvent};
use crate::pipeline::RequestPipeline;
use crate::poller::AdaptivePoller;
use crate::store::{Codec, QualityMode, Store};

/// Orchestrator-level transfer behavior. Replaceable at any time; the
/// orchestrator reads the current value at the start of each item, so a
/// change mid-batch applies from the next item on.
#[derive(Debug, Clone)]
pub struct TransferSettings {
    pub auto_transfer: bool,
    pub target_collection: Option<String>,
    pub quality: QualityMode,
    pub delete_after_transfer: bool,
}

impl From<&TransferConfig> for TransferSettings {
    fn from(cfg: &TransferConfig) -> Self {
        Self {
            auto_transfer: cfg.auto_transfer,
            target_collection: cfg.target_collection.clone(),
            quality: cfg.quality,
            delete_after_transfer: cfg.delete_after_transfer,
        }
    }
}

/// Snapshot returned to status callers.
#[derive(Debug, Clone)]
pub struct ConnectionStatus {
    pub session: SessionSnapshot,
    pub settings: TransferSettings,
    /// Count of remote artifacts already observed this session.
    pub high_water_mark: usize,
    pub polling: bool,
}

/// State shared between the public surface, the poll task, and the
/// folder-source task.
pub(crate) struct Shared {
    pub(crate) session: Arc<DeviceSession>,
    pub(crate) settings: Mutex<TransferSettings>,
    /// Positional high-water mark; reset only by reconnect.
    pub(crate) high_water: AtomicUsize,
    /// Names already persisted, across sessions. Prevents duplicate
    /// persistence when a reconnect resets the positional mark.
    pub(crate) transferred: Mutex<HashSet<String>>,
    pub(crate) codec: Arc<dyn Codec>,
    pub(crate) store: Arc<dyn Store>,
    pub(crate) events: EventBus,
}

/// The orchestrator. Owns its device session exclusively; construct one
/// per camera and pass it down (nothing here is process-global).
pub struct TransferOrchestrator {
    shared: Arc<Shared>,
    poller: AdaptivePoller,
    default_address: Option<String>,
    default_port: u16,
}

impl TransferOrchestrator {
    pub fn new(
        cfg: &CamlinkConfig,
        codec: Arc<dyn Codec>,
        store: Arc<dyn Store>,
        events: EventBus,
    ) -> Self {
        let pipeline = Arc::new(RequestPipeline::new(&cfg.pipeline, events.clone()));
        let session = Arc::new(DeviceSession::new(
            cfg.device.clone(),
            cfg.retry.to_policy(),
            pipeline,
            events.clone(),
        ));
        let shared = Arc::new(Shared {
            session,
            settings: Mutex::new(TransferSettings::from(&cfg.transfer)),
            high_water: AtomicUsize::new(0),
            transferred: Mutex::new(HashSet::new()),
            codec,
            store,
            events,
        });
        let poll_shared = Arc::clone(&shared);
        let poller = AdaptivePoller::new(
            &cfg.poll,
            Box::new(move || {
                let shared = Arc::clone(&poll_shared);
                Box::pin(async move { shared.tick().await })
            }),
        );
        Self {
            shared,
            poller,
            default_address: cfg.device.address.clone(),
            default_port: cfg.device.port,
        }
    }

    /// Connect: an explicit address means a single wireless attempt, with
    /// the configured `[device] address` as the fallback when the caller
    /// gives none; with neither, the loopback candidates are tried in
    /// order. A new session starts with a zero high-water mark; if
    /// auto-transfer is enabled, polling starts immediately.
    pub async fn connect(&self, address: Option<&str>, port: Option<u16>) -> bool {
        let address = address.or(self.default_address.as_deref());
        let ok = match address {
            Some(addr) => {
                self.shared
                    .session
                    .connect(addr, port.unwrap_or(self.default_port))
                    .await
            }
            None => self.shared.session.connect_local().await,
        };
        self.finish_connect(ok)
    }

    /// Loopback-only connect, ignoring any configured address.
    pub async fn connect_local(&self) -> bool {
        let ok = self.shared.session.connect_local().await;
        self.finish_connect(ok)
    }

    fn finish_connect(&self, ok: bool) -> bool {
        if ok {
            self.shared.high_water.store(0, Ordering::SeqCst);
            if self.settings().auto_transfer {
                self.poller.start();
            }
        }
        ok
    }

    /// Stops polling and tears down the session. Outstanding calls fail
    /// naturally against the stale address.
    pub fn disconnect(&self) {
        self.poller.stop();
        self.shared.session.disconnect();
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        ConnectionStatus {
            session: self.shared.session.snapshot(),
            settings: self.settings(),
            high_water_mark: self.shared.high_water.load(Ordering::SeqCst),
            polling: self.poller.is_running(),
        }
    }

    pub fn settings(&self) -> TransferSettings {
        self.shared.settings.lock().unwrap().clone()
    }

    /// Replace the transfer settings wholesale. Starts polling when
    /// auto-transfer turns on with a live session; stops it when
    /// auto-transfer turns off.
    pub fn set_transfer_settings(&self, settings: TransferSettings) {
        let auto = settings.auto_transfer;
        *self.shared.settings.lock().unwrap() = settings;
        if auto && self.shared.session.is_connected() {
            self.poller.start();
        } else if !auto {
            self.poller.stop();
        }
    }

    /// Manual capture: shutter call, settle delay for the device to
    /// finish writing, then one synchronous transfer pass when
    /// auto-transfer is enabled.
    pub async fn take_picture(&self) -> bool {
        if !self.shared.session.is_connected() {
            return false;
        }
        if let Err(e) = self.shared.session.trigger_shutter(true).await {
            tracing::warn!(error = %e, "shutter call failed");
            return false;
        }
        self.shared.events.emit(PipelineEvent::PictureTaken);
        sleep(self.shared.session.settle_delay()).await;
        if self.settings().auto_transfer {
            self.shared.tick().await;
        }
        true
    }

    /// The device's raw status document.
    pub async fn device_status(&self) -> anyhow::Result<serde_json::Value> {
        Ok(self.shared.session.device_status().await?)
    }

    pub async fn artifact_listing(&self) -> anyhow::Result<Vec<ArtifactDescriptor>> {
        Ok(self.shared.session.list_artifacts().await?)
    }

    /// Raw artifact bytes, or None when the download fails.
    pub async fn download_artifact(&self, url: &str) -> Option<Vec<u8>> {
        match self.shared.session.download_artifact(url).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(url, error = %e, "artifact download failed");
                None
            }
        }
    }

    pub async fn delete_artifact(&self, url: &str) -> bool {
        match self.shared.session.delete_artifact(url).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(url, error = %e, "artifact delete failed");
                false
            }
        }
    }

    /// Run one transfer pass now, outside the polling cadence.
    pub async fn run_transfer_tick(&self) {
        self.shared.tick().await;
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.shared.events.subscribe()
    }
}
