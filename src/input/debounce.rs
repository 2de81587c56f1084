use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::models::{TriggerEvent, TriggerKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Active,
    Inactive,
}

/// One raw edge from a trigger input, bounces included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSignal {
    pub kind: TriggerKind,
    pub level: Level,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelState {
    Idle,
    Pressed { since: Instant },
    Settling { since: Instant, until: Instant },
}

/// Turns raw edges into at most one [`TriggerEvent`] per physical press,
/// emitted once the input has stayed inactive for `settle`.
pub struct Debouncer {
    settle: Duration,
    channels: HashMap<TriggerKind, ChannelState>,
}

impl Debouncer {
    pub fn new(settle: Duration) -> Self {
        Self {
            settle,
            channels: HashMap::new(),
        }
    }

    pub fn observe(&mut self, signal: RawSignal, now: Instant) {
        let state = self
            .channels
            .entry(signal.kind)
            .or_insert(ChannelState::Idle);

        *state = match (*state, signal.level) {
            (ChannelState::Idle, Level::Active) => ChannelState::Pressed { since: now },
            (ChannelState::Pressed { since }, Level::Inactive) => ChannelState::Settling {
                since,
                until: now + self.settle,
            },
            // Contact bounce during release: the press is still going on.
            (ChannelState::Settling { since, .. }, Level::Active) => {
                ChannelState::Pressed { since }
            }
            (current, _) => current,
        };
    }

    /// Emit every press whose settle time has fully elapsed by `now`.
    pub fn poll(&mut self, now: Instant) -> Vec<TriggerEvent> {
        let mut events = Vec::new();
        for (kind, state) in self.channels.iter_mut() {
            if let ChannelState::Settling { since, until } = *state {
                if now >= until {
                    events.push(TriggerEvent {
                        kind: *kind,
                        observed_at: since,
                    });
                    *state = ChannelState::Idle;
                }
            }
        }
        events.sort_by_key(|event| event.observed_at);
        events
    }

    /// Earliest instant at which [`Debouncer::poll`] could emit.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.channels
            .values()
            .filter_map(|state| match state {
                ChannelState::Settling { until, .. } => Some(*until),
                _ => None,
            })
            .min()
    }

    pub async fn run(
        mut self,
        mut raw: mpsc::Receiver<RawSignal>,
        events: mpsc::Sender<TriggerEvent>,
        cancel_token: CancellationToken,
    ) {
        loop {
            let deadline = self.next_deadline();
            // Only polled when a deadline exists; the fallback is never awaited.
            let wake_at = deadline.unwrap_or_else(Instant::now);

            tokio::select! {
                biased;
                _ = cancel_token.cancelled() => break,
                signal = raw.recv() => match signal {
                    Some(signal) => self.observe(signal, Instant::now()),
                    None => break,
                },
                _ = tokio::time::sleep_until(wake_at), if deadline.is_some() => {}
            }

            for event in self.poll(Instant::now()) {
                log::info!("{} trigger debounced", event.kind.as_str());
                if events.send(event).await.is_err() {
                    log::warn!("trigger listener gone; debouncer stopping");
                    return;
                }
            }
        }
        log::debug!("debouncer stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTLE: Duration = Duration::from_millis(500);

    fn edge(kind: TriggerKind, level: Level) -> RawSignal {
        RawSignal { kind, level }
    }

    #[test]
    fn bouncy_press_emits_once_after_settle() {
        let mut debouncer = Debouncer::new(SETTLE);
        let t0 = Instant::now();

        debouncer.observe(edge(TriggerKind::Close, Level::Active), t0);
        debouncer.observe(edge(TriggerKind::Close, Level::Inactive), t0 + Duration::from_millis(5));
        debouncer.observe(edge(TriggerKind::Close, Level::Active), t0 + Duration::from_millis(8));
        debouncer.observe(edge(TriggerKind::Close, Level::Active), t0 + Duration::from_millis(9));
        debouncer.observe(edge(TriggerKind::Close, Level::Inactive), t0 + Duration::from_millis(40));

        assert!(debouncer.poll(t0 + Duration::from_millis(500)).is_empty());

        let events = debouncer.poll(t0 + Duration::from_millis(540));
        assert_eq!(
            events,
            vec![TriggerEvent {
                kind: TriggerKind::Close,
                observed_at: t0,
            }]
        );
        assert!(debouncer.poll(t0 + Duration::from_secs(10)).is_empty());
    }

    #[test]
    fn held_button_waits_for_release() {
        let mut debouncer = Debouncer::new(SETTLE);
        let t0 = Instant::now();

        debouncer.observe(edge(TriggerKind::Open, Level::Active), t0);
        assert!(debouncer.poll(t0 + Duration::from_secs(5)).is_empty());
        assert_eq!(debouncer.next_deadline(), None);

        debouncer.observe(edge(TriggerKind::Open, Level::Inactive), t0 + Duration::from_secs(5));
        assert_eq!(
            debouncer.next_deadline(),
            Some(t0 + Duration::from_secs(5) + SETTLE)
        );
        assert_eq!(debouncer.poll(t0 + Duration::from_secs(6)).len(), 1);
    }

    #[test]
    fn stray_release_is_ignored() {
        let mut debouncer = Debouncer::new(SETTLE);
        let t0 = Instant::now();

        debouncer.observe(edge(TriggerKind::Generic, Level::Inactive), t0);
        assert!(debouncer.poll(t0 + Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn channels_are_independent() {
        let mut debouncer = Debouncer::new(SETTLE);
        let t0 = Instant::now();

        debouncer.observe(edge(TriggerKind::Close, Level::Active), t0);
        debouncer.observe(edge(TriggerKind::Open, Level::Active), t0 + Duration::from_millis(10));
        debouncer.observe(edge(TriggerKind::Close, Level::Inactive), t0 + Duration::from_millis(20));
        debouncer.observe(edge(TriggerKind::Open, Level::Inactive), t0 + Duration::from_millis(30));

        let kinds: Vec<_> = debouncer
            .poll(t0 + Duration::from_secs(1))
            .into_iter()
            .map(|event| event.kind)
            .collect();
        assert_eq!(kinds, vec![TriggerKind::Close, TriggerKind::Open]);
    }

    #[tokio::test(start_paused = true)]
    async fn run_forwards_settled_presses() {
        let (raw_tx, raw_rx) = mpsc::channel(8);
        let (event_tx, mut event_rx) = mpsc::channel(8);
        let cancel_token = CancellationToken::new();
        let task = tokio::spawn(Debouncer::new(SETTLE).run(raw_rx, event_tx, cancel_token.clone()));

        raw_tx.send(edge(TriggerKind::Close, Level::Active)).await.unwrap();
        raw_tx.send(edge(TriggerKind::Close, Level::Inactive)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(event_rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(200)).await;
        let event = event_rx.try_recv().expect("press settled");
        assert_eq!(event.kind, TriggerKind::Close);

        cancel_token.cancel();
        task.await.unwrap();
    }
}
