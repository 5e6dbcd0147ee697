//! Health snapshot for the hosting surface.

use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use crate::coordinator::{UpdateState, UpdateStatus};
use crate::Engine;

/// Overall service state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// Index ready, last update fine
    Healthy,
    /// Still serving, but the last update failed or the lock looks stale
    Degraded,
    /// No dataset to serve, or the store is unreachable
    Unhealthy,
}

/// Update-pipeline view inside the health snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateHealth {
    /// An update currently holds the lock
    pub in_progress: bool,
    /// The lock holder looks dead (local probe)
    pub lock_stale: bool,
    /// Most recent status transition
    pub status: Option<UpdateStatus>,
    /// RFC 3339 time of the last completed update
    pub last_update: Option<String>,
    /// Records in the live index
    pub data_size: u64,
}

/// What `/health` reports.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    /// Overall state
    pub status: HealthState,
    /// When this snapshot was taken (RFC 3339)
    pub timestamp: String,
    /// The live index exists and is non-empty
    pub index_ready: bool,
    /// Update pipeline state
    pub update: UpdateHealth,
}

impl Engine {
    /// Take a health snapshot. Store failures degrade the snapshot to
    /// `unhealthy` rather than erroring: health must always answer.
    pub async fn health(&self) -> HealthSnapshot {
        let timestamp = Utc::now().to_rfc3339();

        let data_size = match self.store().zcard(&self.live_index_key()).await {
            Ok(count) => count,
            Err(err) => {
                warn!(error = %err, "health: store unreachable");
                return HealthSnapshot {
                    status: HealthState::Unhealthy,
                    timestamp,
                    index_ready: false,
                    update: UpdateHealth {
                        in_progress: false,
                        lock_stale: false,
                        status: None,
                        last_update: None,
                        data_size: 0,
                    },
                };
            }
        };
        let index_ready = data_size > 0;

        let lock = self.lock_view().await.unwrap_or_default();
        let status = self.read_status().await.unwrap_or_default();
        let last_update = match self.store().get(&self.last_update_key()).await {
            Ok(value) => value,
            Err(_) => None,
        };

        let last_failed = matches!(
            status.as_ref().map(|s| &s.state),
            Some(UpdateState::Failed { .. })
        );

        let overall = if !index_ready {
            HealthState::Unhealthy
        } else if last_failed || lock.stale {
            HealthState::Degraded
        } else {
            HealthState::Healthy
        };

        HealthSnapshot {
            status: overall,
            timestamp,
            index_ready,
            update: UpdateHealth {
                in_progress: lock.held,
                lock_stale: lock.stale,
                status,
                last_update,
                data_size,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use cordon_store::{MemoryStore, Store};
    use std::sync::Arc;

    fn engine() -> Engine {
        Engine::new(Arc::new(MemoryStore::new()), EngineConfig::default())
    }

    #[tokio::test]
    async fn test_empty_index_is_unhealthy() {
        let engine = engine();
        let health = engine.health().await;
        assert_eq!(health.status, HealthState::Unhealthy);
        assert!(!health.index_ready);
        assert_eq!(health.update.data_size, 0);
    }

    #[tokio::test]
    async fn test_populated_index_is_healthy() {
        let engine = engine();
        engine
            .store()
            .zadd(&engine.live_index_key(), 10, "1|10|{}".into())
            .await
            .unwrap();

        let health = engine.health().await;
        assert_eq!(health.status, HealthState::Healthy);
        assert!(health.index_ready);
        assert_eq!(health.update.data_size, 1);
        assert!(!health.update.in_progress);
    }

    #[tokio::test]
    async fn test_failed_update_degrades() {
        let engine = engine();
        engine
            .store()
            .zadd(&engine.live_index_key(), 10, "1|10|{}".into())
            .await
            .unwrap();
        engine
            .write_status(UpdateState::Failed {
                error: "boom".into(),
            })
            .await;

        let health = engine.health().await;
        assert_eq!(health.status, HealthState::Degraded);
        assert!(health.index_ready);
    }

    #[tokio::test]
    async fn test_snapshot_serializes() {
        let engine = engine();
        let health = engine.health().await;
        let json = serde_json::to_string(&health).unwrap();
        assert!(json.contains(r#""status":"unhealthy""#));
        assert!(json.contains(r#""index_ready":false"#));
    }
}
