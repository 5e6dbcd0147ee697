//! Simple line-list feeds: one CIDR or address per line.
//!
//! Covers sources that publish plain text lists (Cloudflare's ips-v4,
//! Spamhaus DROP). Comment lines start with `#` or `;`; inline comments
//! after whitespace are stripped; anything left that is not made of digits,
//! dots, and slashes is discarded.

use std::path::Path;

use async_trait::async_trait;
use cordon_core::{network_to_range, SourceRange, Tag};
use tracing::{instrument, warn};

use crate::config::FeedToggle;
use crate::fetch::{Fetcher, LIST_TIMEOUT};
use crate::staging::{stage_ranges, StagedFeed};
use crate::{FeedMetadata, FeedPlugin, Result};

const CLOUDFLARE_URL: &str = "https://www.cloudflare.com/ips-v4";
const SPAMHAUS_DROP_URL: &str = "https://www.spamhaus.org/drop/drop.txt";

/// A feed whose body is one network per line.
pub struct LineListFeed {
    meta: FeedMetadata,
    url: String,
    tag: Tag,
    fetcher: Fetcher,
}

impl LineListFeed {
    /// Cloudflare's published IPv4 ranges.
    pub fn cloudflare(toggle: &FeedToggle) -> Result<Self> {
        Self::new(
            "cloudflare",
            "Cloudflare published IPv4 ranges",
            toggle.url.as_deref().unwrap_or(CLOUDFLARE_URL),
            Tag::new("list", "cloudflare").with("name", "Cloudflare"),
            toggle.abort_on_fail,
        )
    }

    /// The Spamhaus DROP (Don't Route Or Peer) list.
    pub fn spamhaus_drop(toggle: &FeedToggle) -> Result<Self> {
        Self::new(
            "spamhaus_drop",
            "Spamhaus DROP hijacked/leased netblocks",
            toggle.url.as_deref().unwrap_or(SPAMHAUS_DROP_URL),
            Tag::new("list", "spamhaus_drop").with("name", "Spamhaus DROP"),
            toggle.abort_on_fail,
        )
    }

    fn new(
        name: &str,
        description: &str,
        url: &str,
        tag: Tag,
        abort_on_fail: bool,
    ) -> Result<Self> {
        Ok(Self {
            meta: FeedMetadata {
                name: name.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: description.to_string(),
                abort_on_fail,
            },
            url: url.to_string(),
            tag,
            fetcher: Fetcher::new(LIST_TIMEOUT)?,
        })
    }
}

#[async_trait]
impl FeedPlugin for LineListFeed {
    fn metadata(&self) -> &FeedMetadata {
        &self.meta
    }

    #[instrument(skip(self), fields(feed = %self.meta.name))]
    async fn load(&self, staging_dir: &Path) -> Result<StagedFeed> {
        let body = self.fetcher.get_text(&self.meta.name, &self.url).await?;
        let ranges = parse_lines(&self.meta.name, &body, &self.tag);
        stage_ranges(staging_dir, &self.meta.name, ranges)
    }
}

/// Parse a plain-text list body into ranges, skipping comments and
/// unparseable lines.
fn parse_lines(feed: &str, body: &str, tag: &Tag) -> Vec<SourceRange> {
    let mut ranges = Vec::new();
    for raw in body.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        // Inline comments follow the network after whitespace.
        let Some(token) = line.split_whitespace().next() else {
            continue;
        };
        if !token.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '/') {
            continue;
        }
        match network_to_range(token) {
            Ok((start, end)) => ranges.push(SourceRange::new(start, end, tag.clone())),
            Err(err) => {
                warn!(feed = %feed, line = %raw, error = %err, "skipping unparseable line");
            }
        }
    }
    ranges
}
