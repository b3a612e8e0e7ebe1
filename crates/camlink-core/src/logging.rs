//! Logging setup for the CLI: a log file under the XDG state dir, with
//! stderr taking over when the file cannot be opened.

use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Never fails: when the state dir is
/// unusable the subscriber writes to stderr instead and says so.
pub fn init() {
    match open_log_file() {
        Ok((path, file)) => {
            install(BoxMakeWriter::new(Mutex::new(file)));
            tracing::info!("logging to {}", path.display());
        }
        Err(e) => {
            install(BoxMakeWriter::new(std::io::stderr));
            tracing::warn!(error = %e, "log file unavailable, logging to stderr");
        }
    }
}

fn open_log_file() -> Result<(PathBuf, File)> {
    let state_dir = xdg::BaseDirectories::with_prefix("camlink")?
        .get_state_home()
        .join("camlink");
    std::fs::create_dir_all(&state_dir)?;
    let path = state_dir.join("camlink.log");
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((path, file))
}

fn install(writer: BoxMakeWriter) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,camlink_core=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
}
