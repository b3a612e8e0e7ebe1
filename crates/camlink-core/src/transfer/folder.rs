//! Local folder source: files dropped into a watched directory go through
//! the same transform/persist path as device artifacts.
//!
//! The watcher itself (inotify or a scanner) lives with the caller; this
//! module only consumes a channel of paths, so tests and the CLI can feed
//! it without any filesystem watching machinery.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::events::PipelineEvent;

use super::{Shared, TransferOrchestrator};

impl TransferOrchestrator {
    /// Consume paths from `rx` until the sender side closes. Each path is
    /// ingested independently; failures are reported on the event bus and
    /// never stop the loop. Local files are never deleted.
    pub fn attach_folder_source(&self, mut rx: mpsc::Receiver<PathBuf>) -> JoinHandle<()> {
        let shared = std::sync::Arc::clone(&self.shared);
        tokio::spawn(async move {
            while let Some(path) = rx.recv().await {
                shared.ingest_local_file(&path).await;
            }
            tracing::debug!("folder source channel closed");
        })
    }
}

impl Shared {
    /// Read, transform, and persist one local file. Unlike device
    /// artifacts there is no high-water mark; the channel itself is the
    /// dedup boundary.
    pub(crate) async fn ingest_local_file(&self, path: &std::path::Path) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.events.emit(PipelineEvent::DownloadFailed {
                    name,
                    error: e.to_string(),
                });
                return;
            }
        };
        let settings = self.settings.lock().unwrap().clone();
        let source = path.display().to_string();
        if let Some(record_id) = self.transform_and_persist(&name, &source, bytes, &settings) {
            self.events.emit(PipelineEvent::ArtifactTransferred { name, record_id });
        }
    }
}
