//! Feed configuration records.

use serde::{Deserialize, Serialize};

/// Per-feed switch: on/off, URL override, and failure policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedToggle {
    /// Whether the feed participates in updates
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Override the built-in endpoint URL
    #[serde(default)]
    pub url: Option<String>,

    /// If true, this feed failing fails the whole update
    #[serde(default)]
    pub abort_on_fail: bool,
}

impl Default for FeedToggle {
    fn default() -> Self {
        Self {
            enabled: true,
            url: None,
            abort_on_fail: false,
        }
    }
}

/// MaxMind GeoLite2 ASN configuration; disabled until a license key is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaxmindConfig {
    /// Whether the feed participates in updates (requires a license key)
    #[serde(default)]
    pub enabled: bool,

    /// GeoLite2 download license key
    #[serde(default)]
    pub license_key: Option<String>,

    /// Override the built-in download URL (the license key is appended)
    #[serde(default)]
    pub url: Option<String>,

    /// If true, this feed failing fails the whole update
    #[serde(default)]
    pub abort_on_fail: bool,
}

/// Which feeds run in an update cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedsConfig {
    /// Cloudflare published ranges
    #[serde(default)]
    pub cloudflare: FeedToggle,

    /// Spamhaus DROP list
    #[serde(default)]
    pub spamhaus_drop: FeedToggle,

    /// AWS ip-ranges.json
    #[serde(default)]
    pub aws: FeedToggle,

    /// GCP cloud.json
    #[serde(default)]
    pub gcp: FeedToggle,

    /// Google services goog.json
    #[serde(default)]
    pub google: FeedToggle,

    /// Fastly public IP list
    #[serde(default)]
    pub fastly: FeedToggle,

    /// MaxMind GeoLite2 ASN blocks
    #[serde(default)]
    pub maxmind: MaxmindConfig,
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FeedsConfig::default();
        assert!(config.cloudflare.enabled);
        assert!(!config.cloudflare.abort_on_fail);
        // MaxMind stays off until a license key is configured.
        assert!(!config.maxmind.enabled);
    }

    #[test]
    fn test_toml_overrides() {
        let config: FeedsConfig = toml::from_str(
            r#"
            [spamhaus_drop]
            abort_on_fail = true

            [maxmind]
            enabled = true
            license_key = "k"
            "#,
        )
        .unwrap();
        assert!(config.spamhaus_drop.abort_on_fail);
        assert!(config.spamhaus_drop.enabled);
        assert!(config.maxmind.enabled);
        assert_eq!(config.maxmind.license_key.as_deref(), Some("k"));
    }
}
