// crates/sync-engine/src/auto_sync.rs
//! Periodic background sync

use crate::orchestrator::SyncOrchestrator;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Shortest accepted interval
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Runs `perform_full_sync` on a fixed interval until stopped or dropped
///
/// Ticks that arrive while a pass is still running are skipped, and a tick
/// that lands during a manual sync gets a `Skipped` report.
#[derive(Debug)]
pub struct AutoSync {
    handle: JoinHandle<()>,
    interval: Duration,
}

impl AutoSync {
    /// Starts syncing every `interval`; the first pass runs one interval from now
    pub fn start(orchestrator: Arc<SyncOrchestrator>, interval: Duration) -> Self {
        let interval = interval.max(MIN_INTERVAL);
        log::info!("Auto sync every {:?}", interval);

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let report = orchestrator.perform_full_sync().await;
                log::debug!("Auto sync pass ended: {:?}", report.outcome);
            }
        });

        Self { handle, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn stop(&self) {
        if !self.handle.is_finished() {
            log::info!("Stopping auto sync");
            self.handle.abort();
        }
    }
}

impl Drop for AutoSync {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
