//! The distributed single-writer update lock.
//!
//! The lock is a KV entry valued `"<pid>-<unix_ts>"`, acquired with
//! only-if-absent plus a TTL and released with compare-and-delete, so an
//! instance can only ever release its own acquisition.
//!
//! Before giving up on a held lock, the holder's PID is probed on the
//! local host. A PID that no longer exists here means the holder died
//! mid-update on this machine: the stale lock is removed (compare-and-
//! delete against the observed value) and acquisition retried once. A
//! holder that is alive — or running on another host, where the probe
//! cannot see it — means busy. The TTL is the safety net for dead holders
//! elsewhere.

use std::time::Duration;

use tracing::{info, warn};

use crate::error::Result;
use crate::Engine;

/// What trying to take the update lock produced.
#[derive(Debug)]
pub(crate) enum LockAttempt {
    /// We hold the lock; the token must be passed back to release it
    Acquired(String),
    /// Another updater holds it
    Busy,
}

/// Observed state of the lock key, for the health surface.
#[derive(Debug, Clone, Copy, Default)]
pub struct LockView {
    /// The lock key currently exists
    pub held: bool,
    /// The recorded holder is a dead local process
    pub stale: bool,
}

impl Engine {
    /// Try to take the update lock, recovering a stale one if the recorded
    /// holder is a dead process on this host.
    pub(crate) async fn try_acquire_lock(&self) -> Result<LockAttempt> {
        let token = lock_token();
        let ttl = Duration::from_secs(self.config().update.lock_ttl_secs);
        let key = self.lock_key();

        if self.store().set_nx_ex(&key, &token, ttl).await? {
            return Ok(LockAttempt::Acquired(token));
        }

        // Somebody holds it. Stale-holder check, then one retry.
        let Some(observed) = self.store().get(&key).await? else {
            // The holder released between our two calls.
            if self.store().set_nx_ex(&key, &token, ttl).await? {
                return Ok(LockAttempt::Acquired(token));
            }
            return Ok(LockAttempt::Busy);
        };

        if holder_is_alive(&observed) {
            return Ok(LockAttempt::Busy);
        }

        warn!(holder = %observed, "removing stale update lock from dead holder");
        if !self.store().del_if_eq(&key, &observed).await? {
            // Someone else already cleaned it up or took it over.
            return Ok(LockAttempt::Busy);
        }
        if self.store().set_nx_ex(&key, &token, ttl).await? {
            info!("acquired update lock after stale-holder recovery");
            return Ok(LockAttempt::Acquired(token));
        }
        Ok(LockAttempt::Busy)
    }

    /// Release a held lock; only removes the entry if it still carries our
    /// token.
    pub(crate) async fn release_lock(&self, token: &str) {
        match self.store().del_if_eq(&self.lock_key(), token).await {
            Ok(true) => {}
            Ok(false) => warn!("update lock no longer ours at release"),
            Err(err) => warn!(error = %err, "lock release failed"),
        }
    }

    /// Inspect the lock for the health surface.
    pub(crate) async fn lock_view(&self) -> Result<LockView> {
        let Some(observed) = self.store().get(&self.lock_key()).await? else {
            return Ok(LockView::default());
        };
        Ok(LockView {
            held: true,
            stale: !holder_is_alive(&observed),
        })
    }
}

/// Lock value: `<pid>-<unix_ts>`.
fn lock_token() -> String {
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("{}-{}", std::process::id(), ts)
}

/// Best-effort liveness probe of the PID recorded in a lock value.
///
/// Unparseable values count as alive (we cannot prove otherwise), and on
/// platforms without a process table probe everything counts as alive;
/// the TTL covers those cases.
fn holder_is_alive(lock_value: &str) -> bool {
    let Some(pid) = lock_value
        .split('-')
        .next()
        .and_then(|pid| pid.parse::<i32>().ok())
    else {
        return true;
    };

    // Our own PID is trivially alive (a back-to-back run in one process).
    if pid == std::process::id() as i32 {
        return true;
    }

    probe_pid(pid)
}

#[cfg(target_os = "linux")]
fn probe_pid(pid: i32) -> bool {
    procfs::process::Process::new(pid).is_ok()
}

#[cfg(not(target_os = "linux"))]
fn probe_pid(_pid: i32) -> bool {
    true
}
