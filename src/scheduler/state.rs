use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::models::TriggerKind;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    /// Waiting for a superseded session to wind down.
    Starting,
    Sampling,
    /// Deadline reached.
    Expired,
    /// Superseded, cancelled through its handle, or shut down.
    Cancelled,
}

impl SessionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionPhase::Expired | SessionPhase::Cancelled)
    }
}

/// The session currently owning the override slot.
pub(crate) struct ActiveSession {
    pub id: u64,
    pub kind: TriggerKind,
    pub cancel: CancellationToken,
    pub phase: watch::Receiver<SessionPhase>,
}

/// All mutable scheduler state. Only ever touched under the scheduler's lock,
/// and only for as long as a swap takes.
pub(crate) struct SchedulerState {
    active: Option<ActiveSession>,
    /// Session id currently holding the "confirmation in progress" mark.
    awaiting_confirmation: Option<u64>,
    accepting: bool,
}

impl SchedulerState {
    pub fn new() -> Self {
        Self {
            active: None,
            awaiting_confirmation: None,
            accepting: true,
        }
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting
    }

    /// Stop accepting triggers. Returns false if already closed.
    pub fn close(&mut self) -> bool {
        std::mem::replace(&mut self.accepting, false)
    }

    /// Make `session` the active one and hand back whatever it replaced.
    pub fn install(&mut self, session: ActiveSession) -> Option<ActiveSession> {
        self.active.replace(session)
    }

    pub fn take_active(&mut self) -> Option<ActiveSession> {
        self.active.take()
    }

    /// Clear the slot, but only if `id` still owns it.
    pub fn release(&mut self, id: u64) -> bool {
        if self.active.as_ref().map(|s| s.id) == Some(id) {
            self.active = None;
            true
        } else {
            false
        }
    }

    pub fn active(&self) -> Option<(u64, TriggerKind)> {
        self.active.as_ref().map(|s| (s.id, s.kind))
    }

    pub fn is_override_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn begin_confirmation(&mut self, id: u64) {
        self.awaiting_confirmation = Some(id);
    }

    /// Drop the confirmation mark only if `id` is the session that set it.
    pub fn end_confirmation(&mut self, id: u64) -> bool {
        if self.awaiting_confirmation == Some(id) {
            self.awaiting_confirmation = None;
            true
        } else {
            false
        }
    }

    pub fn awaiting_confirmation(&self) -> Option<u64> {
        self.awaiting_confirmation
    }
}

/// Point-in-time view of the scheduler, for logs and callers.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub active_session: Option<u64>,
    pub active_kind: Option<TriggerKind>,
    pub awaiting_confirmation: Option<u64>,
    pub writer_busy: bool,
    pub accepting: bool,
}
