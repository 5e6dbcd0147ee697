//! cordon-engine: ingestion, flattening, lookup, and update coordination.
//!
//! The engine answers one question — "is this IPv4 address on any denylist,
//! allowlist, or cloud-provider range, and which ones?" — by periodically
//! folding many external feeds into a canonical set of disjoint tagged
//! intervals served from a sorted index.
//!
//! # Architecture
//!
//! - [`merge`] concatenates staged feed files into one validated
//!   intermediate CSV
//! - [`flatten`] runs the sweep-line algorithm over the parsed ranges
//! - [`load`] publishes flattened records to a temporary index key and
//!   atomically swaps it over the live key
//! - [`lookup`] serves point queries (one index round trip per lookup) with
//!   an optional TTL cache and optional external DNSBL merge
//! - [`coordinator`] runs the pipeline under a distributed single-writer
//!   lock with status reporting and stale-lock recovery
//! - [`health`] summarizes index and update state for the hosting surface
//!
//! Everything operates through an explicit [`Engine`] context carrying the
//! store handle and key prefix; there are no process-wide singletons.

pub mod config;
pub mod coordinator;
pub mod dnsbl;
mod error;
pub mod flatten;
pub mod health;
pub mod load;
pub mod lookup;
pub mod merge;

use std::sync::Arc;

use cordon_store::Store;

pub use config::EngineConfig;
pub use coordinator::{UpdateOutcome, UpdateState, UpdateStatus};
pub use error::{EngineError, Result};
pub use flatten::flatten;
pub use health::{HealthSnapshot, HealthState};
pub use lookup::{BatchEntry, LookupOutcome};

/// Shared context for the lookup engine and the update coordinator: the
/// store handle plus the key namespace derived from the configured prefix.
#[derive(Clone)]
pub struct Engine {
    store: Arc<dyn Store>,
    config: Arc<EngineConfig>,
}

impl Engine {
    /// Create an engine over a store with the given configuration.
    pub fn new(store: Arc<dyn Store>, config: EngineConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    /// The underlying store handle.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Key of the live interval index.
    #[must_use]
    pub fn live_index_key(&self) -> String {
        format!("{}index", self.config.key_prefix)
    }

    /// Key the loader builds the next dataset under.
    #[must_use]
    pub fn temp_index_key(&self) -> String {
        format!("{}index:tmp", self.config.key_prefix)
    }

    /// Key of the update lock.
    #[must_use]
    pub fn lock_key(&self) -> String {
        format!("{}update:lock", self.config.key_prefix)
    }

    /// Key update status is published under.
    #[must_use]
    pub fn status_key(&self) -> String {
        format!("{}update:status", self.config.key_prefix)
    }

    /// Key of the dataset generation counter (cache invalidation on swap).
    #[must_use]
    pub fn generation_key(&self) -> String {
        format!("{}index:generation", self.config.key_prefix)
    }

    /// Key recording when the last update completed.
    #[must_use]
    pub fn last_update_key(&self) -> String {
        format!("{}update:last", self.config.key_prefix)
    }

    /// Cache key for one IP's lookup result. When `invalidate_on_swap` is
    /// active the dataset generation is embedded so pre-swap entries become
    /// unreachable after an update.
    #[must_use]
    pub fn cache_key(&self, ip: &str, dnsbl: bool, generation: Option<&str>) -> String {
        let mut key = match generation {
            Some(generation) => {
                format!("{}cache:g{}:{}", self.config.key_prefix, generation, ip)
            }
            None => format!("{}cache:{}", self.config.key_prefix, ip),
        };
        if dnsbl {
            key.push_str(":dronebl");
        }
        key
    }
}
