//! Process signals standing in for the trigger buttons and for the
//! termination request.
//!
//! | signal  | trigger |
//! |---------|---------|
//! | SIGUSR1 | close   |
//! | SIGUSR2 | open    |
//! | SIGHUP  | generic |

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::debounce::RawSignal;

/// Forward trigger signals to the debouncer as press/release edge pairs.
#[cfg(unix)]
pub fn spawn_trigger_signals(
    raw: mpsc::Sender<RawSignal>,
    cancel_token: CancellationToken,
) -> Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    use super::debounce::Level;
    use crate::models::TriggerKind;

    let mut close = signal(SignalKind::user_defined1()).context("failed to watch SIGUSR1")?;
    let mut open = signal(SignalKind::user_defined2()).context("failed to watch SIGUSR2")?;
    let mut generic = signal(SignalKind::hangup()).context("failed to watch SIGHUP")?;

    Ok(tokio::spawn(async move {
        loop {
            let kind = tokio::select! {
                biased;
                _ = cancel_token.cancelled() => break,
                Some(()) = close.recv() => TriggerKind::Close,
                Some(()) = open.recv() => TriggerKind::Open,
                Some(()) = generic.recv() => TriggerKind::Generic,
                else => break,
            };

            for level in [Level::Active, Level::Inactive] {
                if raw.send(RawSignal { kind, level }).await.is_err() {
                    return;
                }
            }
        }
    }))
}

#[cfg(not(unix))]
pub fn spawn_trigger_signals(
    _raw: mpsc::Sender<RawSignal>,
    cancel_token: CancellationToken,
) -> Result<JoinHandle<()>> {
    log::warn!("trigger signals are only available on unix; override sessions disabled");
    Ok(tokio::spawn(async move { cancel_token.cancelled().await }))
}

/// Resolve on SIGINT or, on unix, SIGTERM.
pub async fn wait_for_termination() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate =
            signal(SignalKind::terminate()).context("failed to watch SIGTERM")?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.context("failed to watch SIGINT")?,
            _ = terminate.recv() => {}
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("failed to watch ctrl-c")
    }
}
