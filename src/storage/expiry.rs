//! Background Expiry Sweeper
//!
//! Reads treat expired entries as absent but never remove them. Without
//! active cleanup an entry that expires and is never deleted would stay in
//! memory forever, so a cache constructed with a non-zero cleanup interval
//! owns a [`Sweeper`] that calls its sweep pass on a fixed tick.
//!
//! ## Lifecycle
//!
//! ```text
//!   start(interval > 0)          stop() / handle dropped / owner dropped
//!  ─────────────────────> Running ───────────────────────────────────────> Stopped
//! ```
//!
//! `Stopped` is terminal. A sweep already in progress runs to completion,
//! but no sweep starts after the stop signal is observed. The stop signal is
//! awaited concurrently with the tick, so shutdown does not wait for the
//! next tick to elapse.
//!
//! ## Runtime
//!
//! The sweeper is a Tokio task. When started from inside a Tokio runtime it
//! is spawned there; otherwise it gets a dedicated thread running a
//! current-thread runtime. The task only holds a weak reference to what it
//! sweeps, so the owning cache can be torn down at any time.

use std::future::Future;
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;
use tokio::runtime::{self, Handle};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace};

/// Something a [`Sweeper`] can periodically clean up.
pub trait Sweep: Send + Sync + 'static {
    /// Removes every expired entry and returns how many were removed.
    fn sweep(&self) -> usize;

    /// Number of stored entries, including expired ones not yet swept.
    fn stored(&self) -> usize;
}

/// Observable state of a sweeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweeperState {
    Running,
    Stopped,
}

/// A handle to a running expiry sweeper.
///
/// When this handle is dropped, the sweeper task will be stopped.
#[derive(Debug)]
pub struct Sweeper {
    interval: Duration,
    /// Sender to signal shutdown
    shutdown_tx: watch::Sender<bool>,
}

impl Sweeper {
    /// Starts sweeping `target` every `interval`.
    ///
    /// Returns `None` for a zero interval: the owner then relies on lazy
    /// expiration only.
    pub fn start<T: Sweep>(target: &Arc<T>, interval: Duration) -> Option<Self> {
        if interval.is_zero() {
            return None;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = sweeper_loop(Arc::downgrade(target), interval, shutdown_rx);

        // On failure the task is dropped, the channel closes and the handle
        // reports `Stopped`
        if launch(task) {
            info!(
                interval_ms = interval.as_millis() as u64,
                "Background expiry sweeper started"
            );
        }

        Some(Self {
            interval,
            shutdown_tx,
        })
    }

    /// The time between two sweeps.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns whether the sweeper is still running.
    pub fn state(&self) -> SweeperState {
        if *self.shutdown_tx.borrow() || self.shutdown_tx.is_closed() {
            SweeperState::Stopped
        } else {
            SweeperState::Running
        }
    }

    /// Stops the sweeper. Calling this more than once has no further effect.
    ///
    /// This is called automatically when the handle is dropped.
    pub fn stop(&self) {
        if !self.shutdown_tx.send_replace(true) {
            info!("Background expiry sweeper stopped");
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Runs `task` on the current Tokio runtime, or on a dedicated thread with
/// its own current-thread runtime when there is none.
///
/// Returns `false` if the task could not be started.
fn launch<F>(task: F) -> bool
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(handle) = Handle::try_current() {
        handle.spawn(task);
        return true;
    }

    let rt = match runtime::Builder::new_current_thread().enable_time().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "Failed to build expiry sweeper runtime");
            return false;
        }
    };

    match thread::Builder::new()
        .name("flashcache-sweeper".to_string())
        .spawn(move || rt.block_on(task))
    {
        Ok(_) => true,
        Err(e) => {
            error!(error = %e, "Failed to spawn expiry sweeper thread");
            false
        }
    }
}

/// The main sweeper loop.
async fn sweeper_loop<T: Sweep>(
    owner: Weak<T>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // Wait for the next tick or the shutdown signal
        tokio::select! {
            biased;
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Expiry sweeper received shutdown signal");
                    return;
                }
                continue;
            }
            _ = ticker.tick() => {}
        }

        let Some(target) = owner.upgrade() else {
            debug!("Expiry sweeper target dropped, exiting");
            return;
        };

        let expired = target.sweep();
        if expired > 0 {
            debug!(
                expired = expired,
                remaining = target.stored(),
                "Expired keys cleaned up"
            );
        } else {
            trace!("Sweep found no expired keys");
        }
    }
}
