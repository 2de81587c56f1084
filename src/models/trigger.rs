use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::feedback::Lamp;

/// Which external event started an override session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    Close,
    Open,
    Generic,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Close => "close",
            TriggerKind::Open => "open",
            TriggerKind::Generic => "generic",
        }
    }

    /// Lamp pulsed when this trigger fires, if any.
    pub fn lamp(&self) -> Option<Lamp> {
        match self {
            TriggerKind::Close => Some(Lamp::Close),
            TriggerKind::Open => Some(Lamp::Open),
            TriggerKind::Generic => None,
        }
    }
}

/// A stabilized activation emitted by the debouncer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerEvent {
    pub kind: TriggerKind,
    /// When the press began.
    pub observed_at: Instant,
}
