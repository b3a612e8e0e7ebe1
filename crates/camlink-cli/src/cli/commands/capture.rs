//! `camlink capture` – trigger the shutter, optionally transferring the result.

use anyhow::{bail, Result};

use camlink_core::config::CamlinkConfig;
use camlink_core::events::{EventBus, PipelineEvent};
use camlink_core::transfer::TransferSettings;

use crate::cli::ConnectArgs;

pub async fn run_capture(cfg: &CamlinkConfig, args: &ConnectArgs, no_transfer: bool) -> Result<()> {
    let bus = EventBus::default();
    let mut events = bus.subscribe();
    let orchestrator = super::build_orchestrator(cfg, bus)?;
    super::connect(&orchestrator, args).await?;

    if no_transfer {
        let settings = orchestrator.settings();
        orchestrator.set_transfer_settings(TransferSettings {
            auto_transfer: false,
            ..settings
        });
    }

    if !orchestrator.take_picture().await {
        bail!("shutter call failed");
    }
    println!("Picture taken.");

    while let Ok(event) = events.try_recv() {
        match event {
            PipelineEvent::ArtifactTransferred { name, record_id } => {
                println!("Transferred {} -> {}", name, record_id);
            }
            PipelineEvent::DownloadFailed { name, error } => {
                eprintln!("Download failed for {}: {}", name, error);
            }
            PipelineEvent::ProcessingFailed { name, error } => {
                eprintln!("Processing failed for {}: {}", name, error);
            }
            _ => {}
        }
    }
    orchestrator.disconnect();
    Ok(())
}
