//! AWS `ip-ranges.json` feed.

use std::path::Path;

use async_trait::async_trait;
use cordon_core::{network_to_range, SourceRange, Tag};
use serde::Deserialize;
use tracing::{instrument, warn};

use crate::config::FeedToggle;
use crate::fetch::{Fetcher, LIST_TIMEOUT};
use crate::staging::{stage_ranges, StagedFeed};
use crate::{FeedMetadata, FeedPlugin, Result};

const AWS_URL: &str = "https://ip-ranges.amazonaws.com/ip-ranges.json";

/// AWS published prefix feed.
pub struct AwsFeed {
    meta: FeedMetadata,
    url: String,
    fetcher: Fetcher,
}

impl AwsFeed {
    /// Create the plugin from its configuration record.
    pub fn new(toggle: &FeedToggle) -> Result<Self> {
        Ok(Self {
            meta: FeedMetadata {
                name: "aws".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                description: "AWS published IP ranges (ip-ranges.json)".into(),
                abort_on_fail: toggle.abort_on_fail,
            },
            url: toggle.url.clone().unwrap_or_else(|| AWS_URL.into()),
            fetcher: Fetcher::new(LIST_TIMEOUT)?,
        })
    }

    fn convert(&self, ranges: AwsIpRanges) -> Vec<SourceRange> {
        let mut out = Vec::with_capacity(ranges.prefixes.len());
        for prefix in ranges.prefixes {
            // The prefixes array is IPv4-only; entries without one are skipped.
            let Some(cidr) = prefix.ip_prefix else {
                continue;
            };
            let (start, end) = match network_to_range(&cidr) {
                Ok(range) => range,
                Err(err) => {
                    warn!(feed = "aws", cidr = %cidr, error = %err, "skipping prefix");
                    continue;
                }
            };
            let mut tag = Tag::new("cloud", "aws").with("provider", "aws");
            if let Some(service) = prefix.service {
                tag = tag.with("service", service);
            }
            if let Some(region) = prefix.region {
                tag = tag.with("region", region);
            }
            out.push(SourceRange::new(start, end, tag));
        }
        out
    }
}

#[async_trait]
impl FeedPlugin for AwsFeed {
    fn metadata(&self) -> &FeedMetadata {
        &self.meta
    }

    #[instrument(skip(self), fields(feed = "aws"))]
    async fn load(&self, staging_dir: &Path) -> Result<StagedFeed> {
        let ranges: AwsIpRanges = self.fetcher.get_json(&self.meta.name, &self.url).await?;
        stage_ranges(staging_dir, &self.meta.name, self.convert(ranges))
    }
}

// AWS response shape (ipv6_prefixes ignored).
#[derive(Debug, Deserialize)]
struct AwsIpRanges {
    #[serde(default)]
    prefixes: Vec<AwsPrefix>,
}

#[derive(Debug, Deserialize)]
struct AwsPrefix {
    #[serde(default)]
    ip_prefix: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    service: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_keeps_service_and_region() {
        let feed = AwsFeed::new(&FeedToggle::default()).unwrap();
        let parsed: AwsIpRanges = serde_json::from_str(
            r#"{
                "syncToken": "1",
                "prefixes": [
                    {"ip_prefix": "3.5.140.0/22", "region": "ap-northeast-2", "service": "AMAZON"},
                    {"region": "us-east-1", "service": "S3"}
                ],
                "ipv6_prefixes": [{"ipv6_prefix": "2600:1f18::/32"}]
            }"#,
        )
        .unwrap();

        let ranges = feed.convert(parsed);
        assert_eq!(ranges.len(), 1);
        let tag = ranges[0].tag.canonical();
        assert!(tag.contains(r#""service":"AMAZON""#));
        assert!(tag.contains(r#""region":"ap-northeast-2""#));
        assert!(tag.contains(r#""provider":"aws""#));
        assert_eq!(ranges[0].tag.tag_type(), "cloud");
        assert_eq!(ranges[0].tag.source(), "aws");
    }
}
