//! Loading the merged dataset into the sorted index.
//!
//! The loader parses the merged CSV, flattens the ranges, and publishes the
//! records to the *temporary* index key in batches. Only after the temp key
//! verifies non-empty is it renamed over the live key in a single store
//! operation; a post-rename cardinality check guards against concurrent
//! mutators. On any failure the temp key is deleted and the live key is
//! left untouched.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use cordon_core::{SourceRange, MERGED_HEADER};
use tracing::{debug, info};

use crate::error::{EngineError, Result};
use crate::flatten::flatten;
use crate::Engine;

impl Engine {
    /// Parse, flatten, and publish the merged CSV; returns the number of
    /// records in the live index after the swap.
    pub async fn load_merged(&self, merged_csv: &Path) -> Result<u64> {
        let ranges = read_merged(merged_csv)?;
        info!(ranges = ranges.len(), "parsed merged dataset");

        let records = flatten(ranges);
        info!(records = records.len(), "flattened dataset");

        let temp_key = self.temp_index_key();
        let live_key = self.live_index_key();

        // A previous crashed run may have left a temp key behind.
        self.store().del(&temp_key).await?;

        match self.publish(&temp_key, &live_key, records).await {
            Ok(count) => Ok(count),
            Err(err) => {
                let _ = self.store().del(&temp_key).await;
                Err(err)
            }
        }
    }

    async fn publish(
        &self,
        temp_key: &str,
        live_key: &str,
        records: Vec<cordon_core::IntervalRecord>,
    ) -> Result<u64> {
        let batch_size = self.config().update.batch_size.max(1);

        let mut batch: Vec<(u64, String)> = Vec::with_capacity(batch_size.min(records.len()));
        let mut written = 0usize;
        for record in &records {
            batch.push((record.score(), record.to_member()));
            if batch.len() >= batch_size {
                self.store().zadd_multi(temp_key, &batch).await?;
                written += batch.len();
                debug!(written = written, "wrote index batch");
                batch.clear();
            }
        }
        if !batch.is_empty() {
            self.store().zadd_multi(temp_key, &batch).await?;
            written += batch.len();
        }

        let temp_count = self.store().zcard(temp_key).await?;
        if temp_count == 0 {
            return Err(EngineError::FlattenIntegrity(
                "temporary index is empty".into(),
            ));
        }

        self.store().rename(temp_key, live_key).await?;

        let live_count = self.store().zcard(live_key).await?;
        if live_count != temp_count {
            return Err(EngineError::FlattenIntegrity(format!(
                "live index holds {live_count} records, expected {temp_count}"
            )));
        }

        info!(records = live_count, "dataset swapped live");
        Ok(live_count)
    }
}

/// Read the merged CSV back into source ranges. Unlike the per-line
/// tolerance of the feed stage, the loader is strict: one malformed line
/// aborts the update.
fn read_merged(path: &Path) -> Result<Vec<SourceRange>> {
    let reader = BufReader::new(File::open(path)?);
    let mut ranges = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if idx == 0 {
            if line.trim_end() != MERGED_HEADER {
                return Err(EngineError::MergeValidation(format!(
                    "bad header: {:?}",
                    line.trim_end()
                )));
            }
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }
        ranges.push(SourceRange::from_line(&line)?);
    }
    Ok(ranges)
}
