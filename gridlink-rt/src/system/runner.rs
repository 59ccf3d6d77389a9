//! Async tick driver.
//!
//! The scheduler itself is synchronous; this driver ticks it inside a
//! (current-thread) tokio runtime, yielding between busy ticks and backing
//! off while idle so an embedded node does not spin.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use tracing::debug;

// Layer 3: Internal module imports
use crate::scheduler::{Scheduler, SchedulerStatus};

/// Sleep between ticks while the scheduler reports no work.
pub const DEFAULT_IDLE_DELAY: Duration = Duration::from_millis(5);

/// Tick a scheduler until it reaches Stopped.
pub async fn run_until_stopped(scheduler: &mut Scheduler, idle_delay: Duration) {
    debug!(node = scheduler.name(), "node loop starting");
    loop {
        scheduler.tick();
        if scheduler.status() == SchedulerStatus::Stopped {
            break;
        }
        if scheduler.needs_run() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(idle_delay).await;
        }
    }
    debug!(node = scheduler.name(), "node loop finished");
}
