//! In-process store engine.
//!
//! BTree-backed sorted sets and KV entries behind `parking_lot::RwLock`,
//! which never poisons on panic. Critical sections are short (single map
//! operations), so holding the lock across an `await` never happens.
//!
//! TTL handling is passive: expired entries stay in the map until a read
//! notices they are stale, exactly the "evicted passively" model the cache
//! expects.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::{Result, Store, StoreError};

#[derive(Debug, Clone)]
struct KvEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl KvEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// One sorted set: a score-ordered view plus a member -> score side map so
/// re-adding a member stays O(log n).
#[derive(Debug, Default)]
struct ZSet {
    by_score: BTreeSet<(u64, String)>,
    scores: BTreeMap<String, u64>,
}

impl ZSet {
    fn insert(&mut self, score: u64, member: String) {
        if let Some(old) = self.scores.insert(member.clone(), score) {
            self.by_score.remove(&(old, member.clone()));
        }
        self.by_score.insert((score, member));
    }

    fn len(&self) -> usize {
        self.scores.len()
    }
}

/// In-memory [`Store`] engine.
#[derive(Default)]
pub struct MemoryStore {
    /// Sorted sets ordered by (score, member)
    zsets: RwLock<BTreeMap<String, ZSet>>,
    /// Flat KV entries with optional expiry
    kv: RwLock<BTreeMap<String, KvEntry>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn zadd_multi(&self, key: &str, entries: &[(u64, String)]) -> Result<()> {
        let mut zsets = self.zsets.write();
        let set = zsets.entry(key.to_string()).or_default();
        for (score, member) in entries {
            set.insert(*score, member.clone());
        }
        Ok(())
    }

    async fn zrange_by_score_first(&self, key: &str, min_score: u64) -> Result<Option<String>> {
        let zsets = self.zsets.read();
        let Some(set) = zsets.get(key) else {
            return Ok(None);
        };
        Ok(set
            .by_score
            .range((Bound::Included((min_score, String::new())), Bound::Unbounded))
            .next()
            .map(|(_, member)| member.clone()))
    }

    async fn zcard(&self, key: &str) -> Result<u64> {
        let zsets = self.zsets.read();
        Ok(zsets.get(key).map_or(0, |set| set.len() as u64))
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        {
            let mut zsets = self.zsets.write();
            if let Some(set) = zsets.remove(from) {
                zsets.insert(to.to_string(), set);
                return Ok(());
            }
        }
        let mut kv = self.kv.write();
        match kv.remove(from) {
            Some(entry) => {
                kv.insert(to.to_string(), entry);
                Ok(())
            }
            None => Err(StoreError::NoSuchKey(from.to_string())),
        }
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.zsets.write().remove(key);
        self.kv.write().remove(key);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let kv = self.kv.read();
        Ok(kv
            .get(key)
            .filter(|entry| !entry.is_expired(Instant::now()))
            .map(|entry| entry.value.clone()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.kv.write().insert(
            key.to_string(),
            KvEntry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.kv.write().insert(
            key.to_string(),
            KvEntry {
                value: value.to_string(),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let mut kv = self.kv.write();
        let now = Instant::now();
        if kv.get(key).is_some_and(|entry| !entry.is_expired(now)) {
            return Ok(false);
        }
        kv.insert(
            key.to_string(),
            KvEntry {
                value: value.to_string(),
                expires_at: Some(now + ttl),
            },
        );
        Ok(true)
    }

    async fn del_if_eq(&self, key: &str, expected: &str) -> Result<bool> {
        let mut kv = self.kv.write();
        let now = Instant::now();
        let matches = kv
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now) && entry.value == expected);
        if matches {
            kv.remove(key);
        }
        Ok(matches)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        if self.zsets.read().contains_key(key) {
            return Ok(true);
        }
        let kv = self.kv.read();
        Ok(kv.get(key).is_some_and(|e| !e.is_expired(Instant::now())))
    }
}
