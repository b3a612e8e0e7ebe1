//! Transfer collaborators: the codec and storage seams.
//!
//! The orchestrator only ever sees these traits; the photo-library
//! backend and the real image codec live behind them. `FsStore` is the
//! built-in filesystem implementation used by the CLI and tests.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Output quality for transformed artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityMode {
    Original,
    Compressed,
}

/// Image transform seam. Pure, no network access. Implementations should
/// degrade quality rather than fail for valid image bytes; an error here
/// marks the single item as failed for its tick only.
pub trait Codec: Send + Sync {
    fn transform(&self, bytes: &[u8], quality: QualityMode) -> Result<Vec<u8>>;
}

/// Codec that stores artifacts untouched regardless of quality mode.
pub struct PassthroughCodec;

impl Codec for PassthroughCodec {
    fn transform(&self, bytes: &[u8], _quality: QualityMode) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }
}

/// Everything the storage backend needs to persist one artifact.
#[derive(Debug, Clone)]
pub struct NewRecord {
    /// Collision-resistant target name (`timestamp + basename`).
    pub filename: String,
    /// Transformed artifact bytes.
    pub data: Vec<u8>,
    pub quality: QualityMode,
    /// SHA-256 of `data`, lowercase hex.
    pub sha256: String,
    /// Target collection/gallery, when the settings specify one.
    pub collection: Option<String>,
    /// Where the artifact came from (device URL or watched path).
    pub source: String,
}

/// Storage seam. `create_record` persists one artifact and returns its
/// record id. Not required to be idempotent, but must not block
/// indefinitely.
pub trait Store: Send + Sync {
    fn create_record(&self, record: &NewRecord) -> Result<String>;
}

/// Filesystem store: writes `<dir>/<filename>` via a temp file and atomic
/// rename so a crashed write never leaves a half-written artifact under
/// the final name. The record id is the filename.
pub struct FsStore {
    dir: PathBuf,
}

impl FsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("create download dir {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }
}

impl Store for FsStore {
    fn create_record(&self, record: &NewRecord) -> Result<String> {
        let final_path = self.dir.join(&record.filename);
        let temp_path = self.dir.join(format!(".{}.part", record.filename));
        fs::write(&temp_path, &record.data)
            .with_context(|| format!("write {}", temp_path.display()))?;
        fs::rename(&temp_path, &final_path)
            .with_context(|| format!("rename to {}", final_path.display()))?;
        tracing::debug!(
            filename = %record.filename,
            bytes = record.data.len(),
            sha256 = %record.sha256,
            "artifact persisted"
        );
        Ok(record.filename.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(filename: &str, data: &[u8]) -> NewRecord {
        NewRecord {
            filename: filename.to_string(),
            data: data.to_vec(),
            quality: QualityMode::Original,
            sha256: crate::checksum::sha256_hex(data),
            collection: None,
            source: "http://cam/files/x".to_string(),
        }
    }

    #[test]
    fn fs_store_writes_final_file_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path()).unwrap();
        let id = store.create_record(&record("1700000000000_a.jpg", b"bytes")).unwrap();
        assert_eq!(id, "1700000000000_a.jpg");
        let written = fs::read(dir.path().join("1700000000000_a.jpg")).unwrap();
        assert_eq!(written, b"bytes");
        // No leftover temp file.
        assert!(!dir.path().join(".1700000000000_a.jpg.part").exists());
    }

    #[test]
    fn passthrough_codec_keeps_bytes() {
        let codec = PassthroughCodec;
        let out = codec.transform(b"jpeg", QualityMode::Compressed).unwrap();
        assert_eq!(out, b"jpeg");
    }

    #[test]
    fn quality_mode_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&QualityMode::Compressed).unwrap(), "\"compressed\"");
        let q: QualityMode = serde_json::from_str("\"original\"").unwrap();
        assert_eq!(q, QualityMode::Original);
    }
}
