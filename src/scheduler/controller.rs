use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard,
};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::input::ConfirmationPrompt;
use crate::models::{TriggerEvent, TriggerKind};
use crate::sensing::Recorder;
use crate::settings::{Settings, TriggerProfiles};

use super::session::{ConfirmationGuard, OverrideSession, SessionHandle};
use super::state::{ActiveSession, SchedulerState, SchedulerStatus, SessionPhase};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Static parameters for triggered sessions.
#[derive(Debug, Clone)]
pub struct OverrideConfig {
    pub interval: Duration,
    pub duration: Duration,
    pub confirmation_timeout: Duration,
    pub triggers: TriggerProfiles,
}

impl Default for OverrideConfig {
    fn default() -> Self {
        Settings::default().override_config()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("scheduler is shutting down; {} trigger ignored", .0.as_str())]
    ShuttingDown(TriggerKind),
}

/// Single authority over who samples: the periodic loop, or the one active
/// override session. Newest trigger always wins.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    state: Mutex<SchedulerState>,
    recorder: Recorder,
    prompt: Option<Arc<ConfirmationPrompt>>,
    config: OverrideConfig,
    shutdown: CancellationToken,
    next_session_id: AtomicU64,
}

impl Scheduler {
    pub fn new(
        recorder: Recorder,
        config: OverrideConfig,
        prompt: Option<Arc<ConfirmationPrompt>>,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                state: Mutex::new(SchedulerState::new()),
                recorder,
                prompt,
                config,
                shutdown: CancellationToken::new(),
                next_session_id: AtomicU64::new(1),
            }),
        }
    }

    /// Start an override session for `kind`, cancelling any active one.
    ///
    /// Never blocks: the new session waits for its predecessor on its own task.
    pub fn trigger(&self, kind: TriggerKind) -> Result<SessionHandle, SchedulerError> {
        let config = &self.inner.config;
        let profile = config.triggers.get(kind);
        let id = self.inner.next_session_id.fetch_add(1, Ordering::Relaxed);
        let cancel = self.inner.shutdown.child_token();
        let (phase_tx, phase_rx) = watch::channel(SessionPhase::Starting);

        let superseded = {
            let mut state = self.lock_state();
            if !state.is_accepting() {
                return Err(SchedulerError::ShuttingDown(kind));
            }
            state.install(ActiveSession {
                id,
                kind,
                cancel: cancel.clone(),
                phase: phase_rx.clone(),
            })
        };

        let superseded_phase = superseded.map(|previous| {
            previous.cancel.cancel();
            log_info!(
                "override session {} ({}) superseded by session {} ({})",
                previous.id,
                previous.kind.as_str(),
                id,
                kind.as_str()
            );
            previous.phase
        });

        if let Some(lamp) = kind.lamp() {
            self.inner.recorder.feedback().flash(lamp);
        }

        let session = OverrideSession {
            id,
            kind,
            interval: config.interval,
            deadline: Instant::now() + config.duration,
            cancel: cancel.clone(),
            comment: profile.comment.clone(),
            confirmation: profile.confirmation.clone(),
            confirmation_timeout: config.confirmation_timeout,
        };
        log_info!(
            "override session {} started by {} trigger (every {}s for {}s)",
            id,
            kind.as_str(),
            config.interval.as_secs(),
            config.duration.as_secs()
        );
        tokio::spawn(session.run(self.clone(), superseded_phase, phase_tx));

        Ok(SessionHandle::new(id, kind, cancel, phase_rx))
    }

    /// Forward debounced events into [`Scheduler::trigger`] until the channel
    /// closes or the scheduler shuts down.
    pub async fn listen(self, mut events: mpsc::Receiver<TriggerEvent>) {
        let cancel_token = self.shutdown_token();
        loop {
            let event = tokio::select! {
                biased;
                _ = cancel_token.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            match self.trigger(event.kind) {
                Ok(handle) => log_info!(
                    "{} trigger accepted as session {} ({}ms after press)",
                    event.kind.as_str(),
                    handle.id(),
                    event.observed_at.elapsed().as_millis()
                ),
                Err(err) => log_warn!("{err}"),
            }
        }
    }

    pub fn is_override_active(&self) -> bool {
        self.lock_state().is_override_active()
    }

    pub fn is_awaiting_confirmation(&self) -> bool {
        self.lock_state().awaiting_confirmation().is_some()
    }

    pub fn status(&self) -> SchedulerStatus {
        let state = self.lock_state();
        let active = state.active();
        SchedulerStatus {
            active_session: active.map(|(id, _)| id),
            active_kind: active.map(|(_, kind)| kind),
            awaiting_confirmation: state.awaiting_confirmation(),
            writer_busy: self.inner.recorder.writer_busy(),
            accepting: state.is_accepting(),
        }
    }

    /// Stop accepting triggers, stop background loops and wind down the active
    /// session. Safe to call more than once.
    pub async fn shutdown(&self) {
        let (first_call, active) = {
            let mut state = self.lock_state();
            (state.close(), state.take_active())
        };
        self.inner.shutdown.cancel();

        if let Some(mut active) = active {
            active.cancel.cancel();
            let _ = active.phase.wait_for(|p| p.is_terminal()).await;
            log_info!("override session {} stopped for shutdown", active.id);
        }

        if first_call {
            log_info!("scheduler shut down");
        }
    }

    /// Token cancelled on shutdown; hand one to every background loop.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown.child_token()
    }

    pub fn recorder(&self) -> &Recorder {
        &self.inner.recorder
    }

    pub(crate) fn prompt(&self) -> Option<&ConfirmationPrompt> {
        self.inner.prompt.as_deref()
    }

    pub(crate) fn release(&self, id: u64) {
        self.lock_state().release(id);
    }

    pub(crate) fn begin_confirmation(&self, id: u64) -> ConfirmationGuard {
        self.lock_state().begin_confirmation(id);
        ConfirmationGuard::new(self.clone(), id)
    }

    pub(crate) fn end_confirmation(&self, id: u64) {
        self.lock_state().end_confirmation(id);
    }

    fn lock_state(&self) -> MutexGuard<'_, SchedulerState> {
        match self.inner.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
