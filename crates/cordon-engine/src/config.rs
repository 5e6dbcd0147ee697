//! Engine configuration.

use std::path::PathBuf;

use cordon_feeds::FeedsConfig;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Configuration for a cordon engine instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Prefix for every key this instance touches in the store
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Directory feed plugins stage into
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,

    /// Path of the merged intermediate CSV
    #[serde(default = "default_merged_csv")]
    pub merged_csv: PathBuf,

    /// Update scheduling
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Update pipeline tuning
    #[serde(default)]
    pub update: UpdateConfig,

    /// Lookup result cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// Optional external DNSBL lookups
    #[serde(default)]
    pub dnsbl: DnsblConfig,

    /// Which feeds run in an update
    #[serde(default)]
    pub feeds: FeedsConfig,
}

/// When updates run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Cron expression (seconds-resolution, e.g. `0 0 3 * * *`)
    #[serde(default = "default_cron")]
    pub cron: String,

    /// IANA timezone name the expression is evaluated in
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

/// Update pipeline tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateConfig {
    /// Overall update timeout in seconds
    #[serde(default = "default_update_timeout")]
    pub timeout_secs: u64,

    /// Update lock TTL in seconds
    #[serde(default = "default_lock_ttl")]
    pub lock_ttl_secs: u64,

    /// Index write batch size
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

/// Lookup result cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether lookups consult and fill the cache
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Entry time-to-live in seconds (48 h)
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,

    /// Make pre-swap cache entries unreachable after a successful update
    /// instead of letting them age out by TTL
    #[serde(default)]
    pub invalidate_on_swap: bool,
}

/// External DNSBL settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsblConfig {
    /// Whether `lookup` may consult the external DNSBL at all
    #[serde(default)]
    pub enabled: bool,

    /// Zone the reversed-octet query is issued under
    #[serde(default = "default_dnsbl_zone")]
    pub zone: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
            staging_dir: default_staging_dir(),
            merged_csv: default_merged_csv(),
            schedule: ScheduleConfig::default(),
            update: UpdateConfig::default(),
            cache: CacheConfig::default(),
            dnsbl: DnsblConfig::default(),
            feeds: FeedsConfig::default(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: default_cron(),
            timezone: default_timezone(),
        }
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_update_timeout(),
            lock_ttl_secs: default_lock_ttl(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_cache_ttl(),
            invalidate_on_swap: false,
        }
    }
}

impl Default for DnsblConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            zone: default_dnsbl_zone(),
        }
    }
}

impl EngineConfig {
    /// Load config from a TOML file, falling back to defaults when the file
    /// is absent. `CORDON_KEY_PREFIX` overrides the prefix either way.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content).map_err(|e| EngineError::Config(e.to_string()))?
        } else {
            Self::default()
        };
        if let Ok(prefix) = std::env::var("CORDON_KEY_PREFIX") {
            config.key_prefix = prefix;
        }
        Ok(config)
    }
}

// Default value functions for serde.
fn default_key_prefix() -> String {
    String::from("cordon:")
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from("data/staging")
}

fn default_merged_csv() -> PathBuf {
    PathBuf::from("data/merged.csv")
}

fn default_cron() -> String {
    String::from("0 0 3 * * *")
}

fn default_timezone() -> String {
    String::from("UTC")
}

const fn default_update_timeout() -> u64 {
    600
}

const fn default_lock_ttl() -> u64 {
    3600
}

const fn default_batch_size() -> usize {
    100_000
}

const fn default_cache_ttl() -> u64 {
    48 * 3600
}

fn default_dnsbl_zone() -> String {
    String::from("dnsbl.dronebl.org")
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.key_prefix, "cordon:");
        assert_eq!(config.update.timeout_secs, 600);
        assert_eq!(config.update.lock_ttl_secs, 3600);
        assert_eq!(config.update.batch_size, 100_000);
        assert_eq!(config.cache.ttl_secs, 48 * 3600);
        assert!(config.cache.enabled);
        assert!(!config.cache.invalidate_on_swap);
        assert!(!config.dnsbl.enabled);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = EngineConfig::default();
        let text = toml::to_string(&config).unwrap();
        let parsed: EngineConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.key_prefix, config.key_prefix);
        assert_eq!(parsed.schedule.cron, config.schedule.cron);
    }

    #[test]
    fn test_partial_toml() {
        let config: EngineConfig = toml::from_str(
            r#"
            key_prefix = "test:"

            [schedule]
            cron = "0 30 2 * * *"
            timezone = "Europe/Berlin"

            [cache]
            invalidate_on_swap = true
            "#,
        )
        .unwrap();
        assert_eq!(config.key_prefix, "test:");
        assert_eq!(config.schedule.timezone, "Europe/Berlin");
        assert!(config.cache.invalidate_on_swap);
        // Unspecified sections keep defaults.
        assert_eq!(config.update.batch_size, 100_000);
    }
}
