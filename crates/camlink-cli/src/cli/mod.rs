//! CLI for the camlink camera ingestion pipeline.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use camlink_core::config;

use commands::{
    run_capture, run_completions, run_config, run_delete, run_get, run_list, run_probe,
    run_status, run_sync,
};

/// Top-level CLI for the camlink pipeline.
#[derive(Debug, Parser)]
#[command(name = "camlink")]
#[command(about = "camlink: resilient camera capture and transfer pipeline", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

/// How to reach the camera. An explicit address means a single wireless
/// attempt; otherwise the configured loopback candidates are tried.
#[derive(Debug, Args)]
pub struct ConnectArgs {
    /// Camera address (IP or hostname). Loopback discovery if omitted.
    #[arg(long)]
    pub address: Option<String>,

    /// Camera control port; the configured default if omitted.
    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Connect to the camera and print its identity.
    Probe {
        #[command(flatten)]
        connect: ConnectArgs,
    },

    /// Show the camera's status endpoint.
    Status {
        #[command(flatten)]
        connect: ConnectArgs,
    },

    /// Trigger the shutter; transfers the result if auto-transfer is on.
    Capture {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Skip the post-capture transfer pass.
        #[arg(long)]
        no_transfer: bool,
    },

    /// Connect and keep syncing new artifacts until interrupted.
    Run {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Delete each artifact from the camera after it is persisted.
        #[arg(long)]
        delete: bool,
    },

    /// List the artifacts currently on the camera.
    List {
        #[command(flatten)]
        connect: ConnectArgs,
    },

    /// Download one artifact by its listing URL.
    Get {
        /// Artifact URL from `camlink list`.
        url: String,

        /// Output path (the artifact's basename if omitted).
        #[arg(long, short)]
        output: Option<PathBuf>,

        #[command(flatten)]
        connect: ConnectArgs,
    },

    /// Delete one artifact from the camera by its listing URL.
    Delete {
        /// Artifact URL from `camlink list`.
        url: String,

        #[command(flatten)]
        connect: ConnectArgs,
    },

    /// Print the active configuration and its file path.
    Config,

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Probe { connect } => run_probe(&cfg, &connect).await?,
            CliCommand::Status { connect } => run_status(&cfg, &connect).await?,
            CliCommand::Capture {
                connect,
                no_transfer,
            } => run_capture(&cfg, &connect, no_transfer).await?,
            CliCommand::Run { connect, delete } => run_sync(&cfg, &connect, delete).await?,
            CliCommand::List { connect } => run_list(&cfg, &connect).await?,
            CliCommand::Get {
                url,
                output,
                connect,
            } => run_get(&cfg, &connect, &url, output.as_deref()).await?,
            CliCommand::Delete { url, connect } => run_delete(&cfg, &connect, &url).await?,
            CliCommand::Config => run_config(&cfg)?,
            CliCommand::Completions { shell } => run_completions(shell),
        }

        Ok(())
    }
}
