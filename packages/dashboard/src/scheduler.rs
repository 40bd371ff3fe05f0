//! Fixed-interval polling with reentrancy guarding.
//!
//! The dashboard context is shared behind an async mutex; a tick that
//! arrives while a reconciliation pass still holds the lock is skipped,
//! never queued, so two passes can never interleave their snapshot
//! replacement. A skipped tick loses nothing — the next tick re-polls
//! the full state anyway.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

use crate::DashboardContext;

/// Repeating driver of the reconciliation pipeline.
pub struct Scheduler {
    ctx: Arc<Mutex<DashboardContext>>,
    interval: Duration,
}

impl Scheduler {
    /// Creates a scheduler over a shared context.
    #[must_use]
    pub const fn new(ctx: Arc<Mutex<DashboardContext>>, interval: Duration) -> Self {
        Self { ctx, interval }
    }

    /// Runs one guarded tick.
    ///
    /// Returns `false` when the tick was skipped because a cycle was
    /// still in flight. Cycle failures are logged and surfaced on the
    /// event stream by the context; they do not stop the scheduler.
    pub async fn tick(&self) -> bool {
        match self.ctx.try_lock() {
            Ok(mut ctx) => {
                if let Err(err) = ctx.run_cycle().await {
                    log::warn!("scheduled reconciliation cycle failed: {err}");
                }
                true
            }
            Err(_) => {
                log::debug!("reconciliation cycle still in flight, skipping tick");
                false
            }
        }
    }

    /// Polls forever at the configured interval.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }
}
