//! Point lookups against the live interval index.
//!
//! A lookup costs one index round trip: "first member with score >= ip",
//! then a containment check against the returned record. The optional
//! result cache and the optional external DNSBL query wrap around that
//! core. Cache writes never fail a lookup; a corrupted cache entry reads
//! as a miss.

use std::net::Ipv4Addr;
use std::time::Duration;

use cordon_core::{IntervalRecord, Payload};
use tracing::{debug, warn};

use crate::dnsbl::DnsblClient;
use crate::error::{EngineError, Result};
use crate::Engine;

/// Marker cached for a negative result.
const CACHED_NULL: &str = "null";

/// What a lookup concluded about an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// The address is covered; here is everything that claims it
    Found(Payload),
    /// No list covers this address
    NotFound,
}

/// One entry of a batch lookup response.
#[derive(Debug, Clone)]
pub struct BatchEntry {
    /// The queried address, as given
    pub ip: String,
    /// The covering payload, if any
    pub payload: Option<Payload>,
    /// True when the input was not a dotted-quad IPv4 address
    pub invalid: bool,
}

impl Engine {
    /// Look up one address. `include_dnsbl` additionally consults the
    /// configured external DNSBL provider (off by default) and merges its
    /// tag into the payload's `list` entries.
    pub async fn lookup(&self, ip: &str, include_dnsbl: bool) -> Result<LookupOutcome> {
        let addr: Ipv4Addr = ip
            .trim()
            .parse()
            .map_err(|_| EngineError::InvalidIp(ip.to_string()))?;
        let q = u32::from(addr);
        let include_dnsbl = include_dnsbl && self.config().dnsbl.enabled;

        let generation = self.cache_generation().await;
        let cache_key = self
            .config()
            .cache
            .enabled
            .then(|| self.cache_key(&addr.to_string(), include_dnsbl, generation.as_deref()));

        if let Some(key) = &cache_key {
            if let Some(outcome) = self.cache_probe(key).await {
                return Ok(outcome);
            }
        }

        let outcome = if include_dnsbl {
            let dnsbl = DnsblClient::new(self.config().dnsbl.zone.clone());
            let (indexed, listed) = tokio::join!(self.index_probe(q), dnsbl.check(addr));
            let mut outcome = indexed?;

            match listed {
                Ok(Some(tag)) => {
                    let mut payload = match outcome {
                        LookupOutcome::Found(payload) => payload,
                        LookupOutcome::NotFound => Payload::default(),
                    };
                    payload.push("list", tag);
                    outcome = LookupOutcome::Found(payload);
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(ip = %addr, error = %err, "dnsbl lookup failed, skipping");
                }
            }
            outcome
        } else {
            self.index_probe(q).await?
        };

        if let Some(key) = &cache_key {
            self.cache_fill(key, &outcome).await;
        }
        Ok(outcome)
    }

    /// Look up many addresses; invalid entries are reported per address
    /// rather than failing the batch.
    pub async fn lookup_batch(&self, ips: &[String]) -> Vec<BatchEntry> {
        let mut entries = Vec::with_capacity(ips.len());
        for ip in ips {
            let entry = match self.lookup(ip, false).await {
                Ok(LookupOutcome::Found(payload)) => BatchEntry {
                    ip: ip.clone(),
                    payload: Some(payload),
                    invalid: false,
                },
                Ok(LookupOutcome::NotFound) => BatchEntry {
                    ip: ip.clone(),
                    payload: None,
                    invalid: false,
                },
                Err(EngineError::InvalidIp(_)) => BatchEntry {
                    ip: ip.clone(),
                    payload: None,
                    invalid: true,
                },
                Err(err) => {
                    warn!(ip = %ip, error = %err, "batch lookup entry failed");
                    BatchEntry {
                        ip: ip.clone(),
                        payload: None,
                        invalid: false,
                    }
                }
            };
            entries.push(entry);
        }
        entries
    }

    /// One range query plus the containment check.
    async fn index_probe(&self, q: u32) -> Result<LookupOutcome> {
        let member = self
            .store()
            .zrange_by_score_first(&self.live_index_key(), u64::from(q))
            .await?;

        let Some(member) = member else {
            return Ok(LookupOutcome::NotFound);
        };

        let record = IntervalRecord::from_member(&member)?;
        if record.contains(q) {
            Ok(LookupOutcome::Found(record.payload))
        } else {
            // The first record at-or-above q starts beyond it: q sits in a gap.
            Ok(LookupOutcome::NotFound)
        }
    }

    /// Current dataset generation, when swap invalidation is active.
    async fn cache_generation(&self) -> Option<String> {
        if !(self.config().cache.enabled && self.config().cache.invalidate_on_swap) {
            return None;
        }
        match self.store().get(&self.generation_key()).await {
            Ok(generation) => Some(generation.unwrap_or_else(|| String::from("0"))),
            Err(err) => {
                warn!(error = %err, "generation read failed, bypassing cache");
                None
            }
        }
    }

    async fn cache_probe(&self, key: &str) -> Option<LookupOutcome> {
        let cached = match self.store().get(key).await {
            Ok(cached) => cached?,
            Err(err) => {
                warn!(key = %key, error = %err, "cache read failed");
                return None;
            }
        };
        if cached == CACHED_NULL {
            debug!(key = %key, "cache hit (negative)");
            return Some(LookupOutcome::NotFound);
        }
        match Payload::from_json(&cached) {
            Ok(payload) => {
                debug!(key = %key, "cache hit");
                Some(LookupOutcome::Found(payload))
            }
            Err(err) => {
                // Corrupted entry: treat as a miss.
                warn!(key = %key, error = %err, "unparseable cache entry");
                None
            }
        }
    }

    async fn cache_fill(&self, key: &str, outcome: &LookupOutcome) {
        let value = match outcome {
            LookupOutcome::Found(payload) => payload.to_json(),
            LookupOutcome::NotFound => String::from(CACHED_NULL),
        };
        let ttl = Duration::from_secs(self.config().cache.ttl_secs);
        if let Err(err) = self.store().set_ex(key, &value, ttl).await {
            warn!(key = %key, error = %err, "cache write failed");
        }
    }
}
