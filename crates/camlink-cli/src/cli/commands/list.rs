//! `camlink list` – list the artifacts currently on the camera.

use anyhow::Result;

use camlink_core::config::CamlinkConfig;
use camlink_core::events::EventBus;

use crate::cli::ConnectArgs;

pub async fn run_list(cfg: &CamlinkConfig, args: &ConnectArgs) -> Result<()> {
    let orchestrator = super::build_orchestrator(cfg, EventBus::default())?;
    super::connect(&orchestrator, args).await?;

    let listing = orchestrator.artifact_listing().await?;
    if listing.is_empty() {
        println!("No artifacts on the camera.");
    } else {
        println!("{:<32} {:<12} {}", "NAME", "SIZE", "URL");
        for artifact in &listing {
            let size = artifact
                .size
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("{:<32} {:<12} {}", artifact.name, size, artifact.url);
        }
    }
    orchestrator.disconnect();
    Ok(())
}
