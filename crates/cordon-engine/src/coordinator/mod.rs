//! The update coordinator: runs feeds -> merge -> load under the update
//! lock, with status reporting and cleanup on failure.
//!
//! Exactly one updater makes progress at a time; a second trigger while an
//! update runs observes the lock and reports itself skipped. Any failure
//! along the pipeline deletes the temporary CSV and temporary index key,
//! publishes a `failed` status, and releases the lock — the live index and
//! live CSV always remain the last successful version.

mod lock;
mod schedule;
mod status;

pub use lock::LockView;
pub use status::{UpdateState, UpdateStatus};

use std::time::Duration;

use cordon_feeds::{default_plugins, FeedPlugin, StagedFeed};
use futures_util::future::join_all;
use tracing::{error, info, warn};

use crate::error::{EngineError, Result};
use crate::merge;
use crate::Engine;

use self::lock::LockAttempt;

/// How a coordinated update run ended (when it did not error).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// A new dataset was swapped live
    Completed {
        /// Records in the new dataset
        records: u64,
    },
    /// The run stepped aside (another updater holds the lock)
    Skipped {
        /// Why
        reason: String,
    },
}

impl Engine {
    /// Run one full update with the default plugin set.
    pub async fn run_update(&self) -> Result<UpdateOutcome> {
        let plugins = default_plugins(&self.config().feeds)?;
        self.run_update_with(plugins).await
    }

    /// Run one full update with an explicit plugin set.
    pub async fn run_update_with(
        &self,
        plugins: Vec<Box<dyn FeedPlugin>>,
    ) -> Result<UpdateOutcome> {
        let token = match self.try_acquire_lock().await? {
            LockAttempt::Acquired(token) => token,
            LockAttempt::Busy => {
                let reason = String::from("another update holds the lock");
                info!("update skipped: {reason}");
                self.write_status(UpdateState::Skipped {
                    reason: reason.clone(),
                })
                .await;
                return Ok(UpdateOutcome::Skipped { reason });
            }
        };

        let timeout = Duration::from_secs(self.config().update.timeout_secs);
        let result = match tokio::time::timeout(timeout, self.run_pipeline(plugins)).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::UpdateTimeout(timeout.as_secs())),
        };

        let outcome = match result {
            Ok(records) => {
                self.write_status(UpdateState::Completed { records }).await;
                if let Err(err) = self
                    .store()
                    .set(&self.last_update_key(), &chrono::Utc::now().to_rfc3339())
                    .await
                {
                    warn!(error = %err, "last-update timestamp write failed");
                }
                info!(records = records, "update completed");
                Ok(UpdateOutcome::Completed { records })
            }
            Err(err) => {
                error!(error = %err, "update failed");
                self.cleanup_failed_update().await;
                self.write_status(UpdateState::Failed {
                    error: err.to_string(),
                })
                .await;
                Err(err)
            }
        };

        self.release_lock(&token).await;
        outcome
    }

    /// feeds -> merge -> load. Cancellation-safe: dropping this future
    /// (overall timeout) abandons outstanding downloads.
    async fn run_pipeline(&self, plugins: Vec<Box<dyn FeedPlugin>>) -> Result<u64> {
        let staging_dir = self.config().staging_dir.clone();
        let merged_csv = self.config().merged_csv.clone();

        self.write_status(UpdateState::InProgress {
            stage: "feeds".into(),
        })
        .await;
        self.run_feeds(&plugins).await?;

        self.write_status(UpdateState::InProgress {
            stage: "merge".into(),
        })
        .await;
        let lines = merge::merge_staging(&staging_dir, &merged_csv)?;
        info!(lines = lines, "merge complete");
        clear_staging(&staging_dir);

        self.write_status(UpdateState::InProgress {
            stage: "load".into(),
        })
        .await;
        let records = self.load_merged(&merged_csv).await?;

        if self.config().cache.invalidate_on_swap {
            self.bump_generation().await;
        }

        Ok(records)
    }

    /// Fan out all plugins concurrently; a failure is fatal only for
    /// plugins that declared `abort_on_fail`.
    async fn run_feeds(&self, plugins: &[Box<dyn FeedPlugin>]) -> Result<()> {
        let staging_dir = &self.config().staging_dir;
        std::fs::create_dir_all(staging_dir)?;
        clear_staging(staging_dir);

        let loads = plugins.iter().map(|plugin| async move {
            let staged = plugin.load(staging_dir).await?;
            plugin.validate(&staged)?;
            Ok::<StagedFeed, cordon_feeds::FeedError>(staged)
        });
        let results = join_all(loads).await;

        let mut staged_count = 0usize;
        for (plugin, result) in plugins.iter().zip(results) {
            let meta = plugin.metadata();
            match result {
                Ok(staged) => {
                    info!(feed = %meta.name, ranges = staged.ranges, "feed staged");
                    staged_count += 1;
                }
                Err(err) if meta.abort_on_fail => {
                    return Err(EngineError::FeedFatal {
                        feed: meta.name.clone(),
                        reason: err.to_string(),
                    });
                }
                Err(err) => {
                    warn!(feed = %meta.name, error = %err, "feed failed, omitting this cycle");
                    // Drop any partial staging output it left behind.
                    let _ = std::fs::remove_file(staging_dir.join(format!("{}.csv", meta.name)));
                }
            }
        }

        info!(staged = staged_count, total = plugins.len(), "feed stage complete");
        Ok(())
    }

    /// Remove failure leftovers: the temporary CSV and the temporary index
    /// key. The live CSV and live index are never touched here.
    async fn cleanup_failed_update(&self) {
        let temp_csv = merge::temp_path(&self.config().merged_csv);
        if temp_csv.exists() {
            let _ = std::fs::remove_file(&temp_csv);
        }
        if let Err(err) = self.store().del(&self.temp_index_key()).await {
            warn!(error = %err, "temp index cleanup failed");
        }
    }

    /// Advance the dataset generation after a successful swap so cache keys
    /// from the previous dataset become unreachable.
    async fn bump_generation(&self) {
        let key = self.generation_key();
        let current = match self.store().get(&key).await {
            Ok(value) => value.and_then(|v| v.parse::<u64>().ok()).unwrap_or(0),
            Err(err) => {
                warn!(error = %err, "generation read failed, not bumping");
                return;
            }
        };
        if let Err(err) = self.store().set(&key, &(current + 1).to_string()).await {
            warn!(error = %err, "generation bump failed");
        }
    }
}

/// Delete all non-hidden files in the staging directory.
fn clear_staging(staging_dir: &std::path::Path) {
    let Ok(entries) = std::fs::read_dir(staging_dir) else {
        return;
    };
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        let hidden = path
            .file_name()
            .map(|n| n.to_string_lossy().starts_with('.'))
            .unwrap_or(true);
        if path.is_file() && !hidden {
            let _ = std::fs::remove_file(&path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::lookup::LookupOutcome;
    use async_trait::async_trait;
    use cordon_core::{SourceRange, Tag};
    use cordon_feeds::staging::stage_ranges;
    use cordon_feeds::{FeedError, FeedMetadata};
    use cordon_store::{MemoryStore, Store};
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Test double: stages fixed ranges, or fails, after an optional delay.
    struct MockFeed {
        meta: FeedMetadata,
        ranges: Vec<SourceRange>,
        fail: bool,
        delay: Duration,
    }

    impl MockFeed {
        fn ok(name: &str, ranges: Vec<SourceRange>) -> Box<dyn FeedPlugin> {
            Box::new(Self {
                meta: meta(name, false),
                ranges,
                fail: false,
                delay: Duration::ZERO,
            })
        }

        fn slow(name: &str, ranges: Vec<SourceRange>, delay: Duration) -> Box<dyn FeedPlugin> {
            Box::new(Self {
                meta: meta(name, false),
                ranges,
                fail: false,
                delay,
            })
        }

        fn failing(name: &str, abort_on_fail: bool) -> Box<dyn FeedPlugin> {
            Box::new(Self {
                meta: meta(name, abort_on_fail),
                ranges: Vec::new(),
                fail: true,
                delay: Duration::ZERO,
            })
        }
    }

    fn meta(name: &str, abort_on_fail: bool) -> FeedMetadata {
        FeedMetadata {
            name: name.into(),
            version: "test".into(),
            description: "mock feed".into(),
            abort_on_fail,
        }
    }

    #[async_trait]
    impl FeedPlugin for MockFeed {
        fn metadata(&self) -> &FeedMetadata {
            &self.meta
        }

        async fn load(&self, staging_dir: &Path) -> cordon_feeds::Result<StagedFeed> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(FeedError::Fetch {
                    feed: self.meta.name.clone(),
                    reason: "mock failure".into(),
                });
            }
            stage_ranges(staging_dir, &self.meta.name, self.ranges.clone())
        }
    }

    fn ranges(name: &str, start: u32, end: u32) -> Vec<SourceRange> {
        vec![SourceRange::new(
            start,
            end,
            Tag::new("list", name).with("name", name),
        )]
    }

    fn test_engine(dir: &TempDir) -> Engine {
        let mut config = EngineConfig::default();
        config.staging_dir = dir.path().join("staging");
        config.merged_csv = dir.path().join("merged.csv");
        Engine::new(Arc::new(MemoryStore::new()), config)
    }

    #[tokio::test]
    async fn test_update_completes_and_serves() {
        let dir = tempfile::tempdir().unwrap();
        let engine = test_engine(&dir);

        let outcome = engine
            .run_update_with(vec![
                MockFeed::ok("feed_a", ranges("a", 100, 200)),
                MockFeed::ok("feed_b", ranges("b", 150, 300)),
            ])
            .await
            .unwrap();

        assert!(matches!(outcome, UpdateOutcome::Completed { records: 3 }));
        // Lock released, status completed.
        assert!(!engine.lock_view().await.unwrap().held);
        let status = engine.read_status().await.unwrap().unwrap();
        assert!(matches!(status.state, UpdateState::Completed { records: 3 }));
        // Staging files were discarded after the merge.
        assert_eq!(
            std::fs::read_dir(&engine.config().staging_dir)
                .unwrap()
                .count(),
            0
        );

        match engine.lookup("0.0.0.175", false).await.unwrap() {
            LookupOutcome::Found(payload) => {
                assert_eq!(payload.get("list").unwrap().len(), 2);
            }
            LookupOutcome::NotFound => panic!("175 must be covered by both feeds"),
        }
    }

    #[tokio::test]
    async fn test_nonfatal_feed_failure_is_omitted() {
        let dir = tempfile::tempdir().unwrap();
        let engine = test_engine(&dir);

        let outcome = engine
            .run_update_with(vec![
                MockFeed::ok("feed_a", ranges("a", 100, 200)),
                MockFeed::failing("feed_b", false),
            ])
            .await
            .unwrap();

        assert!(matches!(outcome, UpdateOutcome::Completed { records: 1 }));
    }

    #[tokio::test]
    async fn test_fatal_feed_failure_keeps_previous_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let engine = test_engine(&dir);

        // First update succeeds.
        engine
            .run_update_with(vec![MockFeed::ok("feed_a", ranges("a", 100, 200))])
            .await
            .unwrap();

        // Second update dies on a fatal feed.
        let err = engine
            .run_update_with(vec![
                MockFeed::ok("feed_a", ranges("changed", 1000, 2000)),
                MockFeed::failing("critical", true),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::FeedFatal { .. }));

        let status = engine.read_status().await.unwrap().unwrap();
        assert!(matches!(status.state, UpdateState::Failed { .. }));
        assert!(!engine.lock_view().await.unwrap().held);
        assert!(!engine.store().exists(&engine.temp_index_key()).await.unwrap());

        // The previous dataset still serves.
        match engine.lookup("0.0.0.150", false).await.unwrap() {
            LookupOutcome::Found(_) => {}
            LookupOutcome::NotFound => panic!("previous dataset must remain live"),
        }
        assert_eq!(
            engine.lookup("0.0.3.232", false).await.unwrap(),
            LookupOutcome::NotFound,
            "the aborted dataset must not serve"
        );
    }

    #[tokio::test]
    async fn test_concurrent_update_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let engine = test_engine(&dir);

        let slow = engine.run_update_with(vec![MockFeed::slow(
            "slow",
            ranges("a", 1, 10),
            Duration::from_millis(200),
        )]);
        let engine2 = engine.clone();
        let contender = async {
            // Let the first run take the lock.
            tokio::time::sleep(Duration::from_millis(50)).await;
            engine2
                .run_update_with(vec![MockFeed::ok("fast", ranges("b", 20, 30))])
                .await
        };

        let (first, second) = tokio::join!(slow, contender);
        assert!(matches!(first.unwrap(), UpdateOutcome::Completed { .. }));
        assert!(matches!(second.unwrap(), UpdateOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn test_back_to_back_updates_serialize() {
        let dir = tempfile::tempdir().unwrap();
        let engine = test_engine(&dir);

        for _ in 0..2 {
            let outcome = engine
                .run_update_with(vec![MockFeed::ok("feed_a", ranges("a", 1, 10))])
                .await
                .unwrap();
            assert!(matches!(outcome, UpdateOutcome::Completed { .. }));
        }
    }

    #[tokio::test]
    async fn test_update_timeout_fails_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let mut config = EngineConfig::default();
        config.staging_dir = dir.path().join("staging");
        config.merged_csv = dir.path().join("merged.csv");
        config.update.timeout_secs = 0;
        let engine = Engine::new(store, config);

        let err = engine
            .run_update_with(vec![MockFeed::slow(
                "slow",
                ranges("a", 1, 10),
                Duration::from_millis(200),
            )])
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::UpdateTimeout(_)));
        assert!(!engine.lock_view().await.unwrap().held);
        let status = engine.read_status().await.unwrap().unwrap();
        assert!(matches!(status.state, UpdateState::Failed { .. }));
    }

    #[tokio::test]
    async fn test_generation_bumped_on_swap() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let mut config = EngineConfig::default();
        config.staging_dir = dir.path().join("staging");
        config.merged_csv = dir.path().join("merged.csv");
        config.cache.invalidate_on_swap = true;
        let engine = Engine::new(store, config);

        engine
            .run_update_with(vec![MockFeed::ok("feed_a", ranges("a", 1, 10))])
            .await
            .unwrap();
        assert_eq!(
            engine.store().get(&engine.generation_key()).await.unwrap(),
            Some("1".into())
        );

        engine
            .run_update_with(vec![MockFeed::ok("feed_a", ranges("a", 1, 10))])
            .await
            .unwrap();
        assert_eq!(
            engine.store().get(&engine.generation_key()).await.unwrap(),
            Some("2".into())
        );
    }
}
