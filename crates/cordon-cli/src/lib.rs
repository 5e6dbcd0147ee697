//! # cordon-cli
//!
//! Thin command-line surface over the cordon engine:
//!
//! - `cordon update` — run one update cycle now
//! - `cordon lookup <ip>` — ask who claims an address
//! - `cordon batch <file|->` — look up many addresses
//! - `cordon health` — print the health snapshot
//! - `cordon serve` — startup update, then the cron schedule
//!
//! All results print as JSON on stdout; logs go to stderr.

pub mod cli;

pub use cli::run;
