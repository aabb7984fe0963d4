//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod generate;
mod watch;

pub use generate::GenerateArgs;

use anyhow::{Context, Result};
use clap::Subcommand;
use kiln_client::{ClientConfig, JobClient};
use std::sync::Arc;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Submit a generation job and follow it until it finishes
    Generate(GenerateArgs),
    /// Follow an already submitted job
    Watch {
        /// Job ID returned by the service
        job_id: String,
    },
}

/// Handle a CLI command
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
///
/// # Returns
/// Result indicating success or failure
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    let client = Arc::new(
        JobClient::with_config(&ClientConfig::new(config.base_url.clone()))
            .context("Failed to create HTTP client")?,
    );

    match command {
        Commands::Generate(args) => generate::handle_generate(args, client, config).await,
        Commands::Watch { job_id } => watch::watch_job(client, config, job_id.into()).await,
    }
}
