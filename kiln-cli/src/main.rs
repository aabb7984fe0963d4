//! Kiln CLI
//!
//! Command-line interface for submitting generation jobs and watching them
//! until they finish.

mod commands;
mod config;
mod display;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "kiln")]
#[command(about = "Submit image generation jobs and follow their progress", long_about = None)]
struct Cli {
    /// Generation service URL
    #[arg(long, env = "KILN_BASE_URL", default_value = kiln_client::transport::DEFAULT_BASE_URL)]
    base_url: String,

    /// Session cookie sent with every request
    #[arg(long, env = "KILN_COOKIE", hide_env_values = true)]
    cookie: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kiln_cli=info,kiln_poller=info,kiln_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.base_url, cli.cookie)?;

    handle_command(cli.command, &config).await
}
