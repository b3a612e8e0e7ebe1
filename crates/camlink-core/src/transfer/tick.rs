//! One polling tick: diff the remote listing against the high-water mark
//! and run the download/transform/persist/delete pipeline per new item.

use std::sync::atomic::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::checksum;
use crate::device::ArtifactDescriptor;
use crate::events::PipelineEvent;
use crate::store::NewRecord;

use super::{Shared, TransferSettings};

impl Shared {
    /// Returns false only when the listing fetch itself fails (the poller
    /// backs off on that); per-item failures are converted to events and
    /// never abort the tick. After the tick the mark equals the listing
    /// length regardless of per-item outcomes: a failed item is not
    /// retried unless a reconnect resets the mark while the device still
    /// has it.
    pub(crate) async fn tick(&self) -> bool {
        if !self.session.is_connected() {
            return true;
        }
        let listing = match self.session.list_artifacts().await {
            Ok(listing) => listing,
            Err(e) => {
                tracing::warn!(error = %e, "artifact listing fetch failed");
                self.events.emit(PipelineEvent::TransferError {
                    error: e.to_string(),
                });
                return false;
            }
        };
        let mark = self.high_water.load(Ordering::SeqCst);
        for item in listing.iter().skip(mark) {
            self.process_item(item).await;
        }
        self.high_water.store(listing.len(), Ordering::SeqCst);
        true
    }

    /// Download, transform, persist, and optionally delete one artifact.
    /// Settings are read here, not at discovery time, so a change
    /// mid-batch applies to the next item.
    pub(crate) async fn process_item(&self, item: &ArtifactDescriptor) {
        if self.transferred.lock().unwrap().contains(&item.name) {
            // Already persisted in an earlier session; the positional
            // mark was reset by a reconnect.
            return;
        }
        let settings = self.settings.lock().unwrap().clone();

        let bytes = match self.session.download_artifact(&item.url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.events.emit(PipelineEvent::DownloadFailed {
                    name: item.name.clone(),
                    error: e.to_string(),
                });
                return;
            }
        };

        let Some(record_id) =
            self.transform_and_persist(&item.name, &item.url, bytes, &settings)
        else {
            return;
        };
        self.transferred.lock().unwrap().insert(item.name.clone());
        self.events.emit(PipelineEvent::ArtifactTransferred {
            name: item.name.clone(),
            record_id,
        });

        if settings.delete_after_transfer {
            // Best-effort: a failed delete keeps the persisted copy and
            // is never rolled back.
            if let Err(e) = self.session.delete_artifact(&item.url).await {
                self.events.emit(PipelineEvent::DeleteFailed {
                    name: item.name.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    /// Shared tail of the device and folder pipelines. Returns the record
    /// id, or None after emitting `ProcessingFailed`.
    pub(crate) fn transform_and_persist(
        &self,
        name: &str,
        source: &str,
        bytes: Vec<u8>,
        settings: &TransferSettings,
    ) -> Option<String> {
        let data = match self.codec.transform(&bytes, settings.quality) {
            Ok(data) => data,
            Err(e) => {
                self.events.emit(PipelineEvent::ProcessingFailed {
                    name: name.to_string(),
                    error: format!("codec: {:#}", e),
                });
                return None;
            }
        };
        let record = NewRecord {
            filename: collision_resistant_name(name),
            sha256: checksum::sha256_hex(&data),
            quality: settings.quality,
            collection: settings.target_collection.clone(),
            source: source.to_string(),
            data,
        };
        match self.store.create_record(&record) {
            Ok(record_id) => Some(record_id),
            Err(e) => {
                self.events.emit(PipelineEvent::ProcessingFailed {
                    name: name.to_string(),
                    error: format!("persist: {:#}", e),
                });
                None
            }
        }
    }
}

/// `timestamp + basename`, millisecond resolution.
fn collision_resistant_name(basename: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("{}_{}", millis, basename)
}
