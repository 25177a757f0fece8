//! kb-agent CLI - Entry point
//!
//! Usage: kb-agent <command> [options]

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kb_agent::cli::{Cli, Commands};
use kb_agent::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(std::path::Path::new(path))?,
        None => Config::load()?,
    };

    // Run command
    match cli.command {
        Commands::Store(args) => kb_agent::cli::store::run(args, &config).await,
        Commands::Query(args) => kb_agent::cli::query::run(args, &config).await,
        Commands::Clear(args) => kb_agent::cli::clear::run(args, &config).await,
        Commands::Invoke(args) => kb_agent::cli::invoke::run(args, &config).await,
    }
}
