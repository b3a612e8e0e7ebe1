//! `camlink run` – keep syncing new artifacts until interrupted.

use anyhow::Result;

use camlink_core::config::CamlinkConfig;
use camlink_core::events::{EventBus, PipelineEvent};
use camlink_core::transfer::TransferSettings;

use crate::cli::ConnectArgs;

pub async fn run_sync(cfg: &CamlinkConfig, args: &ConnectArgs, delete: bool) -> Result<()> {
    let bus = EventBus::default();
    let mut events = bus.subscribe();
    let orchestrator = super::build_orchestrator(cfg, bus)?;
    super::connect(&orchestrator, args).await?;

    let settings = orchestrator.settings();
    orchestrator.set_transfer_settings(TransferSettings {
        auto_transfer: true,
        delete_after_transfer: delete || settings.delete_after_transfer,
        ..settings
    });

    let status = orchestrator.connection_status();
    if let Some(info) = &status.session.info {
        println!("Watching {} (serial {}); Ctrl-C to stop.", info.name, info.serial);
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => print_event(&event),
                // Lagged: the bus dropped old events under load; keep going.
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(dropped = n, "event stream lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    println!("Stopping.");
    orchestrator.disconnect();
    Ok(())
}

fn print_event(event: &PipelineEvent) {
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
        PipelineEvent::DeleteFailed { name, error } => {
            eprintln!("Delete failed for {} (local copy kept): {}", name, error);
        }
        PipelineEvent::TransferError { error } => {
            eprintln!("Transfer pass failed: {}", error);
        }
        PipelineEvent::RetryAttempt {
            label,
            attempt,
            max_attempts,
            delay,
            ..
        } => {
            eprintln!(
                "Retrying {} (attempt {}/{}, next in {:?})",
                label,
                attempt,
                max_attempts + 1,
                delay
            );
        }
        PipelineEvent::Disconnected => println!("Disconnected."),
        _ => {}
    }
}
