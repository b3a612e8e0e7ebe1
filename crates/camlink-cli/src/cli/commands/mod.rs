//! CLI command handlers. Each command is in its own file.

mod capture;
mod completions;
mod config;
mod delete;
mod get;
mod list;
mod probe;
mod status;
mod sync;

pub use capture::run_capture;
pub use completions::run_completions;
pub use config::run_config;
pub use delete::run_delete;
pub use get::run_get;
pub use list::run_list;
pub use probe::run_probe;
pub use status::run_status;
pub use sync::run_sync;

use anyhow::{bail, Result};
use std::sync::Arc;

use camlink_core::config::CamlinkConfig;
use camlink_core::events::EventBus;
use camlink_core::store::{FsStore, PassthroughCodec, Store};
use camlink_core::transfer::TransferOrchestrator;

use super::ConnectArgs;

/// Build the orchestrator the way every command needs it: filesystem
/// store at the configured download dir (current dir if unset) behind
/// the passthrough codec.
pub(crate) fn build_orchestrator(
    cfg: &CamlinkConfig,
    events: EventBus,
) -> Result<TransferOrchestrator> {
    let dir = match &cfg.transfer.download_dir {
        Some(dir) => std::path::PathBuf::from(dir),
        None => std::env::current_dir()?,
    };
    let store = Arc::new(FsStore::new(dir)?) as Arc<dyn Store>;
    Ok(TransferOrchestrator::new(
        cfg,
        Arc::new(PassthroughCodec),
        store,
        events,
    ))
}

/// Connect per the command-line arguments, or fail the command. With no
/// `--address` the orchestrator falls back to the configured
/// `[device] address`, then to loopback discovery.
pub(crate) async fn connect(
    orchestrator: &TransferOrchestrator,
    args: &ConnectArgs,
) -> Result<()> {
    let ok = orchestrator
        .connect(args.address.as_deref(), args.port)
        .await;
    if !ok {
        match &args.address {
            Some(addr) => bail!("no camera answered at {}", addr),
            None => bail!("no camera answered at the configured address or local candidates"),
        }
    }
    Ok(())
}
