//! Ordered key/score store contract for the cordon interval index.
//!
//! The index is a *contract*, not a technology: an ordered container keyed
//! by a 64-bit score plus a flat key/value namespace with TTLs. The engine
//! crate only ever talks to the [`Store`] trait; [`MemoryStore`] is the
//! in-process engine, and an external sorted-set deployment is one more
//! backend behind the same contract.
//!
//! Contract points the engine relies on:
//!
//! - `zrange_by_score_first(key, q)` returns the lowest-scoring member with
//!   score >= q — the single round trip behind every lookup.
//! - `rename(from, to)` replaces `to` in one step; readers observe either
//!   the old or the new dataset, never a mix.
//! - `set_nx_ex` / `del_if_eq` are the only-if-absent acquire and the
//!   compare-and-delete release of the update lock.
//! - KV entries expire passively: an expired entry is simply absent.

pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryStore;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by a store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A key required by the operation does not exist
    #[error("no such key: {0}")]
    NoSuchKey(String),

    /// The backend failed (connection, protocol, corruption)
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Ordered key/score store: sorted sets for the interval index, flat KV
/// with TTLs for cache, lock, and status keys.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Insert members into the sorted set at `key`. Re-adding an existing
    /// member updates its score.
    async fn zadd_multi(&self, key: &str, entries: &[(u64, String)]) -> Result<()>;

    /// The lowest-scoring member whose score is >= `min_score`, if any.
    async fn zrange_by_score_first(&self, key: &str, min_score: u64) -> Result<Option<String>>;

    /// Number of members in the sorted set at `key` (0 if absent).
    async fn zcard(&self, key: &str) -> Result<u64>;

    /// Atomically rename `from` to `to`, replacing any existing `to`.
    ///
    /// Fails with [`StoreError::NoSuchKey`] if `from` does not exist.
    async fn rename(&self, from: &str, to: &str) -> Result<()>;

    /// Delete a key of any kind. Deleting an absent key is not an error.
    async fn del(&self, key: &str) -> Result<()>;

    /// Read a KV entry; an expired entry reads as absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a KV entry with a time-to-live.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Write a KV entry with no expiry.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Write a KV entry with a TTL only if the key is absent (or expired).
    /// Returns whether the write happened.
    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool>;

    /// Delete a KV entry only if its current value equals `expected`.
    /// Returns whether the delete happened.
    async fn del_if_eq(&self, key: &str, expected: &str) -> Result<bool>;

    /// Whether a sorted-set or KV key currently exists.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Convenience single-member insert.
    async fn zadd(&self, key: &str, score: u64, member: String) -> Result<()> {
        self.zadd_multi(key, &[(score, member)]).await
    }
}
