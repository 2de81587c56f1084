use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::scheduler::Scheduler;

use super::recorder::RecordOutcome;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// An override session owned the slot; the tick was dropped, not deferred.
    Suppressed,
    Sampled(RecordOutcome),
}

/// Steady background cadence. Runs until the scheduler shuts down.
pub struct PeriodicSampler {
    scheduler: Scheduler,
    interval: Duration,
    comment: String,
}

impl PeriodicSampler {
    pub fn new(scheduler: Scheduler, interval: Duration, comment: impl Into<String>) -> Self {
        Self {
            scheduler,
            interval,
            comment: comment.into(),
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(self) {
        let cancel_token = self.scheduler.shutdown_token();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        log_info!(
            "periodic sampler started (every {}s)",
            self.interval.as_secs()
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel_token.cancelled() => {
                    log_info!("periodic sampler shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    pub async fn tick(&self) -> TickOutcome {
        if self.scheduler.is_override_active() {
            log_debug!("override session active; periodic sample skipped");
            return TickOutcome::Suppressed;
        }
        TickOutcome::Sampled(self.scheduler.recorder().record(&self.comment).await)
    }
}
