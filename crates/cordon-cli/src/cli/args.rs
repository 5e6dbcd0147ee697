//! Command-line argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Aggregate IP denylists, allowlists, and cloud ranges; answer which of
/// them claim an address.
#[derive(Parser, Debug)]
#[command(name = "cordon")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the engine configuration TOML
    #[arg(short, long, global = true, default_value = "cordon.toml")]
    pub config: PathBuf,

    /// Override the store key prefix
    #[arg(long, global = true, env = "CORDON_KEY_PREFIX")]
    pub key_prefix: Option<String>,

    /// Increase log verbosity
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one update cycle now
    Update,

    /// Look up which lists claim an IPv4 address
    Lookup(LookupArgs),

    /// Look up many addresses from a file (or `-` for stdin)
    Batch(BatchArgs),

    /// Print the health snapshot
    Health,

    /// Run the startup update, then updates on the cron schedule
    Serve,
}

#[derive(Args, Debug)]
pub struct LookupArgs {
    /// Dotted-quad IPv4 address
    pub ip: String,

    /// Also consult the external DNSBL provider
    #[arg(long)]
    pub dnsbl: bool,

    /// Run an update first (one-shot usage against a fresh store)
    #[arg(long)]
    pub update: bool,
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// File with one address per line, or `-` for stdin
    pub file: String,

    /// Run an update first (one-shot usage against a fresh store)
    #[arg(long)]
    pub update: bool,
}
