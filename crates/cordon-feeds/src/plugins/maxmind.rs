//! MaxMind GeoLite2 ASN feed: a zipped CSV of network -> AS organization.

use std::io::{Cursor, Read};
use std::path::Path;

use async_trait::async_trait;
use cordon_core::{network_to_range, SourceRange, Tag};
use serde::Deserialize;
use tracing::{instrument, warn};
use zip::ZipArchive;

use crate::config::MaxmindConfig;
use crate::error::FeedError;
use crate::fetch::{Fetcher, ARCHIVE_TIMEOUT};
use crate::staging::{stage_ranges, StagedFeed};
use crate::{FeedMetadata, FeedPlugin, Result};

const MAXMIND_URL: &str =
    "https://download.maxmind.com/app/geoip_download?edition_id=GeoLite2-ASN-CSV&suffix=zip";

/// The archive entry holding IPv4 blocks.
const BLOCKS_SUFFIX: &str = "-Blocks-IPv4.csv";

/// GeoLite2 ASN blocks feed.
#[derive(Debug)]
pub struct MaxmindAsnFeed {
    meta: FeedMetadata,
    url: String,
    fetcher: Fetcher,
}

impl MaxmindAsnFeed {
    /// Create the plugin from its configuration record; requires a license
    /// key unless the URL is overridden.
    pub fn new(config: &MaxmindConfig) -> Result<Self> {
        let url = match (&config.url, &config.license_key) {
            (Some(url), _) => url.clone(),
            (None, Some(key)) => format!("{MAXMIND_URL}&license_key={key}"),
            (None, None) => {
                return Err(FeedError::NotConfigured {
                    feed: "maxmind_lite".into(),
                    reason: "license_key is required".into(),
                })
            }
        };
        Ok(Self {
            meta: FeedMetadata {
                name: "maxmind_lite".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                description: "MaxMind GeoLite2 ASN IPv4 blocks".into(),
                abort_on_fail: config.abort_on_fail,
            },
            url,
            fetcher: Fetcher::new(ARCHIVE_TIMEOUT)?,
        })
    }
}

#[async_trait]
impl FeedPlugin for MaxmindAsnFeed {
    fn metadata(&self) -> &FeedMetadata {
        &self.meta
    }

    #[instrument(skip(self), fields(feed = "maxmind_lite"))]
    async fn load(&self, staging_dir: &Path) -> Result<StagedFeed> {
        let bytes = self.fetcher.get_bytes(&self.meta.name, &self.url).await?;
        let ranges = parse_blocks_zip(&bytes)?;
        stage_ranges(staging_dir, &self.meta.name, ranges)
    }
}

/// Extract the IPv4 blocks CSV from the archive and parse its rows.
fn parse_blocks_zip(bytes: &[u8]) -> Result<Vec<SourceRange>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| FeedError::Archive(format!("unreadable zip: {e}")))?;

    let entry_name = archive
        .file_names()
        .find(|name| name.ends_with(BLOCKS_SUFFIX))
        .map(String::from)
        .ok_or_else(|| {
            FeedError::Archive(format!("no {BLOCKS_SUFFIX} entry in archive"))
        })?;

    let entry = archive
        .by_name(&entry_name)
        .map_err(|e| FeedError::Archive(format!("cannot open {entry_name}: {e}")))?;

    parse_blocks_csv(entry)
}

/// Parse `(network, autonomous_system_organization)` rows into tagged ranges.
fn parse_blocks_csv(reader: impl Read) -> Result<Vec<SourceRange>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut ranges = Vec::new();
    for row in csv_reader.deserialize() {
        let row: BlockRow = match row {
            Ok(row) => row,
            Err(err) => {
                warn!(feed = "maxmind_lite", error = %err, "skipping csv row");
                continue;
            }
        };
        let (start, end) = match network_to_range(&row.network) {
            Ok(range) => range,
            Err(err) => {
                warn!(feed = "maxmind_lite", network = %row.network, error = %err, "skipping row");
                continue;
            }
        };
        let tag = Tag::new("asn", "maxmind_lite")
            .with("name", row.autonomous_system_organization.as_str());
        ranges.push(SourceRange::new(start, end, tag));
    }
    Ok(ranges)
}

#[derive(Debug, Deserialize)]
struct BlockRow {
    network: String,
    #[serde(default)]
    autonomous_system_organization: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    const CSV_BODY: &str = "\
network,autonomous_system_number,autonomous_system_organization
1.0.0.0/24,13335,CLOUDFLARENET
1.0.4.0/22,38803,Gtelecom Pty Ltd
not-a-network,1,Bogus
";

    fn build_archive() -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            writer
                .start_file(
                    "GeoLite2-ASN-CSV_20260101/GeoLite2-ASN-Blocks-IPv4.csv",
                    SimpleFileOptions::default(),
                )
                .unwrap();
            writer.write_all(CSV_BODY.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn test_parse_blocks_zip() {
        let ranges = parse_blocks_zip(&build_archive()).unwrap();
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0].tag.tag_type(), "asn");
        assert_eq!(ranges[0].tag.source(), "maxmind_lite");
        assert!(ranges[0].tag.canonical().contains("CLOUDFLARENET"));
    }

    #[test]
    fn test_missing_blocks_entry() {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            writer
                .start_file("README.txt", SimpleFileOptions::default())
                .unwrap();
            writer.write_all(b"nothing here").unwrap();
            writer.finish().unwrap();
        }
        let err = parse_blocks_zip(&buf.into_inner()).unwrap_err();
        assert!(matches!(err, FeedError::Archive(_)));
    }

    #[test]
    fn test_requires_license_key() {
        let err = MaxmindAsnFeed::new(&MaxmindConfig::default()).unwrap_err();
        assert!(matches!(err, FeedError::NotConfigured { .. }));
    }
}
