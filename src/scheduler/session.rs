use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::models::TriggerKind;
use crate::settings::ConfirmationMapping;

use super::controller::Scheduler;
use super::state::SessionPhase;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Caller-side view of an override session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: u64,
    kind: TriggerKind,
    cancel: CancellationToken,
    phase: watch::Receiver<SessionPhase>,
}

impl SessionHandle {
    pub(crate) fn new(
        id: u64,
        kind: TriggerKind,
        cancel: CancellationToken,
        phase: watch::Receiver<SessionPhase>,
    ) -> Self {
        Self {
            id,
            kind,
            cancel,
            phase,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> TriggerKind {
        self.kind
    }

    pub fn phase(&self) -> SessionPhase {
        *self.phase.borrow()
    }

    /// Ask the session to stop at its next loop boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait until the session reaches a terminal phase.
    pub async fn finished(&self) -> SessionPhase {
        let mut phase = self.phase.clone();
        let terminal = match phase.wait_for(|p| p.is_terminal()).await {
            Ok(terminal) => *terminal,
            // Sender gone without publishing a terminal phase: the task died.
            Err(_) => SessionPhase::Cancelled,
        };
        terminal
    }
}

/// A time-bounded burst of samples started by a trigger.
pub(crate) struct OverrideSession {
    pub id: u64,
    pub kind: TriggerKind,
    pub interval: Duration,
    pub deadline: Instant,
    pub cancel: CancellationToken,
    pub comment: String,
    pub confirmation: Option<ConfirmationMapping>,
    pub confirmation_timeout: Duration,
}

impl OverrideSession {
    pub(crate) async fn run(
        self,
        scheduler: Scheduler,
        superseded: Option<watch::Receiver<SessionPhase>>,
        phase: watch::Sender<SessionPhase>,
    ) {
        let outcome = self.drive(&scheduler, superseded, &phase).await;

        // Free the slot before publishing so a finished handle never observes
        // a stale "override active".
        scheduler.release(self.id);
        phase.send_replace(outcome);

        log_info!(
            "override session {} ({}) ended: {:?}",
            self.id,
            self.kind.as_str(),
            outcome
        );
    }

    async fn drive(
        &self,
        scheduler: &Scheduler,
        superseded: Option<watch::Receiver<SessionPhase>>,
        phase: &watch::Sender<SessionPhase>,
    ) -> SessionPhase {
        // Wait out the predecessor even if cancelled: successors only wait on
        // this session, never on the ones before it.
        if let Some(mut previous) = superseded {
            // An Err here means the old task is gone, which is just as final.
            let _ = previous.wait_for(|p| p.is_terminal()).await;
        }
        if self.cancel.is_cancelled() {
            return SessionPhase::Cancelled;
        }

        phase.send_replace(SessionPhase::Sampling);
        log_info!(
            "override session {} ({}) sampling every {}s",
            self.id,
            self.kind.as_str(),
            self.interval.as_secs()
        );

        let Some(comment) = self.resolve_comment(scheduler).await else {
            return SessionPhase::Cancelled;
        };

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return SessionPhase::Cancelled,
                _ = ticker.tick() => {}
            }

            if Instant::now() >= self.deadline {
                return SessionPhase::Expired;
            }

            // Not interruptible: an issued sample is always written.
            scheduler.recorder().record(&comment).await;
        }
    }

    /// Resolve the session comment once. `None` if cancelled while waiting.
    async fn resolve_comment(&self, scheduler: &Scheduler) -> Option<String> {
        let (Some(mapping), Some(prompt)) = (&self.confirmation, scheduler.prompt()) else {
            return Some(self.comment.clone());
        };

        let _pending = scheduler.begin_confirmation(self.id);
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                log_debug!("session {} cancelled; pending confirmation discarded", self.id);
                None
            }
            comment = prompt.ask(mapping, &self.comment, self.confirmation_timeout) => Some(comment),
        }
    }
}

/// Holds the scheduler's "confirmation in progress" mark for one session and
/// drops it on every exit path, including cancellation of the owning future.
pub(crate) struct ConfirmationGuard {
    scheduler: Scheduler,
    id: u64,
}

impl ConfirmationGuard {
    pub(crate) fn new(scheduler: Scheduler, id: u64) -> Self {
        Self { scheduler, id }
    }
}

impl Drop for ConfirmationGuard {
    fn drop(&mut self) {
        self.scheduler.end_confirmation(self.id);
    }
}
