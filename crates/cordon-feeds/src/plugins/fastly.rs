//! Fastly `public-ip-list` feed.

use std::path::Path;

use async_trait::async_trait;
use cordon_core::{network_to_range, SourceRange, Tag};
use serde::Deserialize;
use tracing::{instrument, warn};

use crate::config::FeedToggle;
use crate::fetch::{Fetcher, LIST_TIMEOUT};
use crate::staging::{stage_ranges, StagedFeed};
use crate::{FeedMetadata, FeedPlugin, Result};

const FASTLY_URL: &str = "https://api.fastly.com/public-ip-list";

/// Fastly edge network ranges.
pub struct FastlyFeed {
    meta: FeedMetadata,
    url: String,
    fetcher: Fetcher,
}

impl FastlyFeed {
    /// Create the plugin from its configuration record.
    pub fn new(toggle: &FeedToggle) -> Result<Self> {
        Ok(Self {
            meta: FeedMetadata {
                name: "fastly".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                description: "Fastly public edge IP ranges".into(),
                abort_on_fail: toggle.abort_on_fail,
            },
            url: toggle.url.clone().unwrap_or_else(|| FASTLY_URL.into()),
            fetcher: Fetcher::new(LIST_TIMEOUT)?,
        })
    }

    fn convert(&self, parsed: FastlyIpList) -> Vec<SourceRange> {
        let tag = Tag::new("cloud", "fastly").with("provider", "fastly");
        let mut out = Vec::with_capacity(parsed.addresses.len());
        for cidr in parsed.addresses {
            match network_to_range(&cidr) {
                Ok((start, end)) => out.push(SourceRange::new(start, end, tag.clone())),
                Err(err) => {
                    warn!(feed = "fastly", cidr = %cidr, error = %err, "skipping address");
                }
            }
        }
        out
    }
}

#[async_trait]
impl FeedPlugin for FastlyFeed {
    fn metadata(&self) -> &FeedMetadata {
        &self.meta
    }

    #[instrument(skip(self), fields(feed = "fastly"))]
    async fn load(&self, staging_dir: &Path) -> Result<StagedFeed> {
        let parsed: FastlyIpList = self.fetcher.get_json(&self.meta.name, &self.url).await?;
        stage_ranges(staging_dir, &self.meta.name, self.convert(parsed))
    }
}

// Response shape; ipv6_addresses ignored.
#[derive(Debug, Deserialize)]
struct FastlyIpList {
    #[serde(default)]
    addresses: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert() {
        let feed = FastlyFeed::new(&FeedToggle::default()).unwrap();
        let parsed: FastlyIpList = serde_json::from_str(
            r#"{"addresses": ["23.235.32.0/20", "bogus"], "ipv6_addresses": ["2a04:4e40::/32"]}"#,
        )
        .unwrap();
        let ranges = feed.convert(parsed);
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].tag.source(), "fastly");
    }
}
