//! `camlink status` – show the camera's status document.

use anyhow::Result;

use camlink_core::config::CamlinkConfig;
use camlink_core::events::EventBus;

use crate::cli::ConnectArgs;

pub async fn run_status(cfg: &CamlinkConfig, args: &ConnectArgs) -> Result<()> {
    let orchestrator = super::build_orchestrator(cfg, EventBus::default())?;
    super::connect(&orchestrator, args).await?;

    let status = orchestrator.device_status().await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    orchestrator.disconnect();
    Ok(())
}
