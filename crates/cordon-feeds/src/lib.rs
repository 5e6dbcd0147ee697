//! Feed provider plugins for the cordon IP denylist aggregator.
//!
//! A feed plugin downloads one external source (a denylist, allowlist, or
//! cloud-provider range publication), normalizes it to canonical
//! `start|end|tag_json` lines, and stages the result as a file for the
//! merger. Plugins share free helpers for retrying ([`retry`]), fetching
//! ([`fetch`]), and staging ([`staging`]) rather than a common base type;
//! the only shared surface is the [`FeedPlugin`] trait.
//!
//! Shipped plugins:
//!
//! - [`plugins::LineListFeed`] — Cloudflare, Spamhaus DROP (one CIDR per line)
//! - [`plugins::AwsFeed`] — AWS `ip-ranges.json`
//! - [`plugins::GstaticFeed`] — GCP `cloud.json`, Google services `goog.json`
//! - [`plugins::FastlyFeed`] — Fastly `public-ip-list`
//! - [`plugins::MaxmindAsnFeed`] — GeoLite2 ASN blocks (zipped CSV)

pub mod config;
mod error;
pub mod fetch;
pub mod plugins;
pub mod retry;
pub mod staging;

use std::path::Path;

use async_trait::async_trait;

pub use config::{FeedToggle, FeedsConfig, MaxmindConfig};
pub use error::{FeedError, Result};
pub use plugins::default_plugins;
pub use staging::StagedFeed;

/// Identity and failure policy of a feed plugin.
#[derive(Debug, Clone)]
pub struct FeedMetadata {
    /// Stable feed name; also the staging file stem and the tag `source`
    pub name: String,
    /// Plugin version
    pub version: String,
    /// Human-readable description of the source
    pub description: String,
    /// If true, this feed failing fails the whole update
    pub abort_on_fail: bool,
}

/// A pluggable feed source.
///
/// `load` fetches and stages; `validate` checks the staged output is
/// non-empty and structurally plausible. The update coordinator consults
/// [`FeedMetadata::abort_on_fail`] to decide whether a rejection is fatal.
#[async_trait]
pub trait FeedPlugin: Send + Sync {
    /// The plugin's identity and failure policy.
    fn metadata(&self) -> &FeedMetadata;

    /// Fetch the source and write its canonical lines into `staging_dir`.
    async fn load(&self, staging_dir: &Path) -> Result<StagedFeed>;

    /// Check the staged file is usable by the merger.
    fn validate(&self, staged: &StagedFeed) -> Result<()> {
        staging::validate_staged(staged)
    }
}
