//! Integration test: fake HTTP camera, capture and sync end to end.
//!
//! Starts a stateful camera, connects the orchestrator to it, takes a
//! picture, runs a transfer pass into a filesystem store, and asserts the
//! persisted artifact matches the served bytes.

mod common;

use std::sync::Arc;

use camlink_core::config::{CamlinkConfig, TransferConfig};
use camlink_core::events::{EventBus, PipelineEvent};
use camlink_core::store::{FsStore, PassthroughCodec, QualityMode, Store};
use camlink_core::transfer::{TransferOrchestrator, TransferSettings};
use tempfile::tempdir;

fn test_config() -> CamlinkConfig {
    let mut cfg = CamlinkConfig::default();
    cfg.device.settle_delay_ms = 10;
    cfg.device.control_timeout_secs = 2;
    cfg.device.download_timeout_secs = 2;
    cfg.retry.max_attempts = 1;
    cfg.retry.base_delay_secs = 0.05;
    cfg.pipeline.request_retries = 0;
    cfg.transfer = TransferConfig {
        auto_transfer: false,
        quality: QualityMode::Original,
        delete_after_transfer: false,
        target_collection: None,
        download_dir: None,
    };
    cfg
}

fn split_address(address: &str) -> (&str, u16) {
    let (host, port) = address.rsplit_once(':').expect("host:port");
    (host, port.parse().expect("port"))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn capture_then_sync_persists_the_artifact() {
    let camera = common::fake_camera::start();
    let out = tempdir().unwrap();
    let bus = EventBus::default();
    let mut events = bus.subscribe();
    let store = Arc::new(FsStore::new(out.path()).unwrap());
    let orchestrator = TransferOrchestrator::new(
        &test_config(),
        Arc::new(PassthroughCodec),
        Arc::clone(&store) as Arc<dyn Store>,
        bus,
    );

    let (host, port) = split_address(&camera.address);
    assert!(orchestrator.connect(Some(host), Some(port)).await);
    let status = orchestrator.connection_status();
    assert!(status.session.connected);
    assert_eq!(status.session.info.as_ref().unwrap().name, "FAKE-CAM");

    assert!(orchestrator.take_picture().await);
    assert_eq!(camera.file_names(), vec!["IMG_0001.jpg".to_string()]);

    orchestrator.run_transfer_tick().await;
    assert_eq!(orchestrator.connection_status().high_water_mark, 1);

    let record_id = loop {
        match events.recv().await.unwrap() {
            PipelineEvent::ArtifactTransferred { name, record_id } => {
                assert_eq!(name, "IMG_0001.jpg");
                break record_id;
            }
            _ => continue,
        }
    };
    let persisted = std::fs::read(out.path().join(&record_id)).unwrap();
    assert_eq!(persisted, b"image data 1");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn delete_after_transfer_clears_the_device() {
    let camera = common::fake_camera::start();
    camera.seed_file("OLD_0001.jpg", b"old shot");
    let out = tempdir().unwrap();
    let orchestrator = TransferOrchestrator::new(
        &test_config(),
        Arc::new(PassthroughCodec),
        Arc::new(FsStore::new(out.path()).unwrap()) as Arc<dyn Store>,
        EventBus::default(),
    );
    orchestrator.set_transfer_settings(TransferSettings {
        auto_transfer: false,
        target_collection: None,
        quality: QualityMode::Original,
        delete_after_transfer: true,
    });

    let (host, port) = split_address(&camera.address);
    assert!(orchestrator.connect(Some(host), Some(port)).await);
    orchestrator.run_transfer_tick().await;

    assert!(camera.file_names().is_empty(), "device copy should be gone");
    let mut persisted: Vec<_> = std::fs::read_dir(out.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    persisted.sort();
    assert_eq!(persisted.len(), 1);
    assert!(persisted[0].ends_with("_OLD_0001.jpg"));
}
