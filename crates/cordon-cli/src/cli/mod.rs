//! CLI entry point and command dispatch.

pub mod args;
mod commands;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cordon_engine::{Engine, EngineConfig};
use cordon_store::MemoryStore;

use args::{Cli, Commands};

/// Parse arguments, build the engine, and dispatch.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let mut config = EngineConfig::load(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    if let Some(prefix) = &cli.key_prefix {
        config.key_prefix = prefix.clone();
    }

    let engine = Engine::new(Arc::new(MemoryStore::new()), config);

    match cli.command {
        Commands::Update => commands::update(&engine).await,
        Commands::Lookup(args) => commands::lookup(&engine, &args).await,
        Commands::Batch(args) => commands::batch(&engine, &args).await,
        Commands::Health => commands::health(&engine).await,
        Commands::Serve => commands::serve(&engine).await,
    }
}

/// Logs go to stderr so stdout stays parseable JSON.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
