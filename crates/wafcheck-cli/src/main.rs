mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = commands::load(cli.config.as_deref(), cli.region)?;

    match cli.command {
        Command::Run { suffix, keep } => commands::run(config, suffix, keep).await,
        Command::Zones => commands::zones(config).await,
        Command::Request { suffix, json } => commands::request(config, suffix, json).await,
        Command::Destroy { suffix } => commands::destroy(config, suffix).await,
    }
}
