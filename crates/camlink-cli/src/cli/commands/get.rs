//! `camlink get <url>` – download one artifact to a local file.

use anyhow::{bail, Result};
use std::path::Path;

use camlink_core::checksum;
use camlink_core::config::CamlinkConfig;
use camlink_core::events::EventBus;

use crate::cli::ConnectArgs;

pub async fn run_get(
    cfg: &CamlinkConfig,
    args: &ConnectArgs,
    url: &str,
    output: Option<&Path>,
) -> Result<()> {
    let orchestrator = super::build_orchestrator(cfg, EventBus::default())?;
    super::connect(&orchestrator, args).await?;

    let Some(bytes) = orchestrator.download_artifact(url).await else {
        bail!("download failed for {}", url);
    };

    let path = match output {
        Some(path) => path.to_path_buf(),
        None => {
            let basename = url.rsplit('/').next().filter(|s| !s.is_empty());
            match basename {
                Some(name) => std::path::PathBuf::from(name),
                None => bail!("cannot derive a filename from {}; use --output", url),
            }
        }
    };
    std::fs::write(&path, &bytes)?;
    println!(
        "Wrote {} ({} bytes, sha256 {})",
        path.display(),
        bytes.len(),
        checksum::sha256_hex(&bytes)
    );
    orchestrator.disconnect();
    Ok(())
}
