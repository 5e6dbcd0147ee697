//! Google-published prefix feeds: GCP `cloud.json` and the all-services
//! `goog.json`. Both share the gstatic prefix-array shape.

use std::path::Path;

use async_trait::async_trait;
use cordon_core::{network_to_range, SourceRange, Tag};
use serde::Deserialize;
use tracing::{instrument, warn};

use crate::config::FeedToggle;
use crate::fetch::{Fetcher, LIST_TIMEOUT};
use crate::staging::{stage_ranges, StagedFeed};
use crate::{FeedMetadata, FeedPlugin, Result};

const GCP_URL: &str = "https://www.gstatic.com/ipranges/cloud.json";
const GOOGLE_URL: &str = "https://www.gstatic.com/ipranges/goog.json";

/// A gstatic prefix-array feed.
pub struct GstaticFeed {
    meta: FeedMetadata,
    url: String,
    source: &'static str,
    provider: &'static str,
    fetcher: Fetcher,
}

impl GstaticFeed {
    /// Google Cloud Platform ranges (`cloud.json`), with service and scope.
    pub fn gcp(toggle: &FeedToggle) -> Result<Self> {
        Self::new(
            "gcp",
            "Google Cloud published IP ranges (cloud.json)",
            toggle.url.as_deref().unwrap_or(GCP_URL),
            "gcp",
            "gcp",
            toggle.abort_on_fail,
        )
    }

    /// All Google services ranges (`goog.json`).
    pub fn google(toggle: &FeedToggle) -> Result<Self> {
        Self::new(
            "google_services",
            "Google services IP ranges (goog.json)",
            toggle.url.as_deref().unwrap_or(GOOGLE_URL),
            "google_services",
            "google",
            toggle.abort_on_fail,
        )
    }

    fn new(
        name: &str,
        description: &str,
        url: &str,
        source: &'static str,
        provider: &'static str,
        abort_on_fail: bool,
    ) -> Result<Self> {
        Ok(Self {
            meta: FeedMetadata {
                name: name.to_string(),
                version: env!("CARGO_PKG_VERSION").into(),
                description: description.to_string(),
                abort_on_fail,
            },
            url: url.to_string(),
            source,
            provider,
            fetcher: Fetcher::new(LIST_TIMEOUT)?,
        })
    }

    fn convert(&self, parsed: GstaticRanges) -> Vec<SourceRange> {
        let mut out = Vec::with_capacity(parsed.prefixes.len());
        for prefix in parsed.prefixes {
            // IPv6-only entries carry ipv6Prefix instead and are skipped.
            let Some(cidr) = prefix.ipv4_prefix else {
                continue;
            };
            let (start, end) = match network_to_range(&cidr) {
                Ok(range) => range,
                Err(err) => {
                    warn!(feed = %self.meta.name, cidr = %cidr, error = %err, "skipping prefix");
                    continue;
                }
            };
            let mut tag = Tag::new("cloud", self.source).with("provider", self.provider);
            if let Some(service) = prefix.service {
                tag = tag.with("service", service);
            }
            if let Some(scope) = prefix.scope {
                tag = tag.with("scope", scope);
            }
            out.push(SourceRange::new(start, end, tag));
        }
        out
    }
}

#[async_trait]
impl FeedPlugin for GstaticFeed {
    fn metadata(&self) -> &FeedMetadata {
        &self.meta
    }

    #[instrument(skip(self), fields(feed = %self.meta.name))]
    async fn load(&self, staging_dir: &Path) -> Result<StagedFeed> {
        let parsed: GstaticRanges = self.fetcher.get_json(&self.meta.name, &self.url).await?;
        stage_ranges(staging_dir, &self.meta.name, self.convert(parsed))
    }
}

#[derive(Debug, Deserialize)]
struct GstaticRanges {
    #[serde(default)]
    prefixes: Vec<GstaticPrefix>,
}

#[derive(Debug, Deserialize)]
struct GstaticPrefix {
    #[serde(rename = "ipv4Prefix", default)]
    ipv4_prefix: Option<String>,
    #[serde(default)]
    service: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_skips_ipv6_entries() {
        let feed = GstaticFeed::gcp(&FeedToggle::default()).unwrap();
        let parsed: GstaticRanges = serde_json::from_str(
            r#"{
                "prefixes": [
                    {"ipv4Prefix": "34.0.0.0/15", "service": "Google Cloud", "scope": "us-central1"},
                    {"ipv6Prefix": "2600:1900::/35", "service": "Google Cloud", "scope": "us-east1"}
                ]
            }"#,
        )
        .unwrap();

        let ranges = feed.convert(parsed);
        assert_eq!(ranges.len(), 1);
        let tag = ranges[0].tag.canonical();
        assert!(tag.contains(r#""scope":"us-central1""#));
        assert_eq!(ranges[0].tag.source(), "gcp");
    }

    #[test]
    fn test_google_variant_source() {
        let feed = GstaticFeed::google(&FeedToggle::default()).unwrap();
        let parsed: GstaticRanges =
            serde_json::from_str(r#"{"prefixes": [{"ipv4Prefix": "8.8.8.0/24"}]}"#).unwrap();
        let ranges = feed.convert(parsed);
        assert_eq!(ranges[0].tag.source(), "google_services");
        assert!(ranges[0].tag.canonical().contains(r#""provider":"google""#));
    }
}
