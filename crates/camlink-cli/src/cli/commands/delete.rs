//! `camlink delete <url>` – delete one artifact from the camera.

use anyhow::{bail, Result};

use camlink_core::config::CamlinkConfig;
use camlink_core::events::EventBus;

use crate::cli::ConnectArgs;

pub async fn run_delete(cfg: &CamlinkConfig, args: &ConnectArgs, url: &str) -> Result<()> {
    let orchestrator = super::build_orchestrator(cfg, EventBus::default())?;
    super::connect(&orchestrator, args).await?;

    if !orchestrator.delete_artifact(url).await {
        bail!("delete failed for {}", url);
    }
    println!("Deleted {}", url);
    orchestrator.disconnect();
    Ok(())
}
