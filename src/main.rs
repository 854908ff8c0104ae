mod auth;
mod cli;
mod config;
mod error;
mod metrics;
mod output;
mod providers;
mod scheduler;
mod server;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use env_logger::Env;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting Azure DevOps exporter");
    cli.execute().await?;

    Ok(())
}
