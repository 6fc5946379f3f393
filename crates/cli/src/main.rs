//! Vehicle Health Diagnostics CLI
//!
//! A command-line tool for reading the latest diagnostics snapshot, listing
//! alerts and checking the health of the diagnostics server.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{alerts, diagnostics, health};

/// Vehicle Health Diagnostics CLI
#[derive(Parser)]
#[command(name = "vhd")]
#[command(author, version, about = "CLI for Vehicle Health Diagnostics", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via VHD_API_URL env var)
    #[arg(long, env = "VHD_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the latest diagnostics snapshot
    Diagnostics,

    /// List current alerts
    Alerts {
        /// Only show alerts at or above this severity
        #[arg(long, short, ignore_case = true)]
        severity: Option<output::Severity>,
    },

    /// Show server health and readiness
    Health,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run(Cli::parse()).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::Config::load()?;
    let format = config.resolve_format(cli.format)?;

    // Initialize client
    let client = client::ApiClient::new(&config.resolve_api_url(cli.api_url))?;

    // Execute command
    match cli.command {
        Commands::Diagnostics => diagnostics::show_diagnostics(&client, format).await?,
        Commands::Alerts { severity } => alerts::show_alerts(&client, severity, format).await?,
        Commands::Health => health::show_health(&client, format).await?,
    }

    Ok(())
}
