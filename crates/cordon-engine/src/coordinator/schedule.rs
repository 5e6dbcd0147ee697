//! Scheduled update runs.
//!
//! One update runs at startup, then one at every cron fire time in the
//! configured timezone. The loop awaits each run to completion, so an
//! in-process trigger can never overlap a running update; across processes
//! the lock enforces the same thing, and a skipped run stays skipped —
//! triggers are never queued.

use std::str::FromStr;

use chrono::Utc;
use chrono_tz::Tz;
use cron::Schedule;
use tracing::{error, info, warn};

use crate::error::{EngineError, Result};
use crate::Engine;

impl Engine {
    /// Parse the configured cron expression and timezone.
    pub fn schedule(&self) -> Result<(Schedule, Tz)> {
        let schedule = Schedule::from_str(&self.config().schedule.cron).map_err(|e| {
            EngineError::Schedule(format!(
                "bad cron expression {:?}: {e}",
                self.config().schedule.cron
            ))
        })?;
        let tz: Tz = self.config().schedule.timezone.parse().map_err(|e| {
            EngineError::Schedule(format!(
                "bad timezone {:?}: {e}",
                self.config().schedule.timezone
            ))
        })?;
        Ok((schedule, tz))
    }

    /// Run the startup update, then updates on the cron schedule, forever.
    ///
    /// Individual update failures are logged and the loop continues; only a
    /// broken schedule configuration returns an error.
    pub async fn run_scheduled(&self) -> Result<()> {
        let (schedule, tz) = self.schedule()?;

        info!("running startup update");
        self.run_logged().await;

        loop {
            let now = Utc::now().with_timezone(&tz);
            let Some(next) = schedule.after(&now).next() else {
                warn!("cron schedule has no future fire times, stopping");
                return Ok(());
            };
            let wait = (next - now).to_std().unwrap_or_default();
            info!(next = %next, "next update scheduled");
            tokio::time::sleep(wait).await;
            self.run_logged().await;
        }
    }

    async fn run_logged(&self) {
        match self.run_update().await {
            Ok(outcome) => info!(?outcome, "scheduled update finished"),
            Err(err) => error!(error = %err, "scheduled update failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use cordon_store::MemoryStore;
    use std::sync::Arc;

    fn engine_with_schedule(cron: &str, timezone: &str) -> Engine {
        let mut config = EngineConfig::default();
        config.schedule.cron = cron.into();
        config.schedule.timezone = timezone.into();
        Engine::new(Arc::new(MemoryStore::new()), config)
    }

    #[test]
    fn test_default_schedule_parses() {
        let engine = engine_with_schedule("0 0 3 * * *", "UTC");
        let (schedule, tz) = engine.schedule().unwrap();
        assert_eq!(tz, chrono_tz::UTC);
        // Daily at 03:00 there is always a next fire time.
        assert!(schedule.upcoming(tz).next().is_some());
    }

    #[test]
    fn test_timezone_is_honored() {
        let engine = engine_with_schedule("0 0 3 * * *", "Europe/Berlin");
        let (_, tz) = engine.schedule().unwrap();
        assert_eq!(tz, chrono_tz::Europe::Berlin);
    }

    #[test]
    fn test_bad_cron_rejected() {
        let engine = engine_with_schedule("not a cron line", "UTC");
        assert!(matches!(
            engine.schedule(),
            Err(EngineError::Schedule(_))
        ));
    }

    #[test]
    fn test_bad_timezone_rejected() {
        let engine = engine_with_schedule("0 0 3 * * *", "Mars/Olympus_Mons");
        assert!(matches!(
            engine.schedule(),
            Err(EngineError::Schedule(_))
        ));
    }
}
