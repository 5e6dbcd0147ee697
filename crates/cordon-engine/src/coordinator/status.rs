//! Update status reporting.
//!
//! The coordinator publishes every transition to a status key next to the
//! lock; the health surface exposes it verbatim.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::Engine;

/// Where an update currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UpdateState {
    /// The pipeline is running the named stage
    InProgress {
        /// `feeds`, `merge`, or `load`
        stage: String,
    },
    /// The last update finished and swapped a dataset live
    Completed {
        /// Records in the swapped dataset
        records: u64,
    },
    /// The last update failed; the previous dataset is still live
    Failed {
        /// What went wrong
        error: String,
    },
    /// The last trigger did not run
    Skipped {
        /// Why it was skipped (usually lock contention)
        reason: String,
    },
}

/// A status transition with its wall-clock timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStatus {
    /// The transition
    #[serde(flatten)]
    pub state: UpdateState,
    /// RFC 3339 timestamp of the transition
    pub timestamp: String,
}

impl UpdateStatus {
    /// Stamp a state with the current time.
    #[must_use]
    pub fn now(state: UpdateState) -> Self {
        Self {
            state,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl Engine {
    /// Publish a status transition. Status writes are advisory; a failed
    /// write is logged, not propagated.
    pub(crate) async fn write_status(&self, state: UpdateState) {
        let status = UpdateStatus::now(state);
        let json = match serde_json::to_string(&status) {
            Ok(json) => json,
            Err(err) => {
                warn!(error = %err, "unserializable update status");
                return;
            }
        };
        if let Err(err) = self.store().set(&self.status_key(), &json).await {
            warn!(error = %err, "status write failed");
        }
    }

    /// The most recently published status, if any.
    pub async fn read_status(&self) -> Result<Option<UpdateStatus>> {
        let Some(json) = self.store().get(&self.status_key()).await? else {
            return Ok(None);
        };
        Ok(serde_json::from_str(&json).ok())
    }
}
