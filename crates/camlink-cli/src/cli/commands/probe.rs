//! `camlink probe` – connect and print the camera identity.

use anyhow::Result;

use camlink_core::config::CamlinkConfig;
use camlink_core::events::EventBus;

use crate::cli::ConnectArgs;

pub async fn run_probe(cfg: &CamlinkConfig, args: &ConnectArgs) -> Result<()> {
    let orchestrator = super::build_orchestrator(cfg, EventBus::default())?;
    super::connect(&orchestrator, args).await?;

    let status = orchestrator.connection_status();
    let session = &status.session;
    if let Some(info) = &session.info {
        println!("Connected: {} (serial {})", info.name, info.serial);
        if let Some(firmware) = &info.firmware {
            println!("Firmware:  {}", firmware);
        }
        if let Some(battery) = info.battery {
            println!("Battery:   {}%", battery);
        }
    }
    if let Some(transport) = session.transport {
        println!("Transport: {:?}", transport);
    }
    orchestrator.disconnect();
    Ok(())
}
