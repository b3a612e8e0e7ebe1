//! `camlink config` – print the active configuration.

use anyhow::Result;

use camlink_core::config::{self, CamlinkConfig};

pub fn run_config(cfg: &CamlinkConfig) -> Result<()> {
    let path = config::config_path()?;
    println!("# {}", path.display());
    print!("{}", toml::to_string_pretty(cfg)?);
    Ok(())
}
