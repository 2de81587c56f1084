use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};

/// Physical (or emulated) indicator lamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lamp {
    /// Pulsed on every written sample.
    Sample,
    Close,
    Open,
}

/// Binary output device driven by [`Feedback`].
pub trait Indicator: Send + Sync {
    fn set(&self, lamp: Lamp, on: bool);
}

/// Indicator used when no GPIO is wired in; lamp transitions go to the log.
pub struct LogIndicator;

impl Indicator for LogIndicator {
    fn set(&self, lamp: Lamp, on: bool) {
        log::debug!("lamp {:?} {}", lamp, if on { "on" } else { "off" });
    }
}

/// Fire-and-forget lamp pulses, fully decoupled from the write path.
#[derive(Clone)]
pub struct Feedback {
    indicator: Arc<dyn Indicator>,
    hold: Duration,
}

impl Feedback {
    pub fn new(indicator: Arc<dyn Indicator>, hold: Duration) -> Self {
        Self { indicator, hold }
    }

    /// Turn `lamp` on for the configured hold time. Returns immediately;
    /// must be called from within a tokio runtime.
    pub fn flash(&self, lamp: Lamp) {
        let indicator = Arc::clone(&self.indicator);
        let hold = self.hold;
        tokio::spawn(async move {
            indicator.set(lamp, true);
            tokio::time::sleep(hold).await;
            indicator.set(lamp, false);
        });
    }
}
