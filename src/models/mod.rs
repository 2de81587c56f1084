pub mod reading;
pub mod trigger;

pub use reading::{Measurement, Reading};
pub use trigger::{TriggerEvent, TriggerKind};
