use chrono::{DateTime, Local};
use thiserror::Error;

use crate::models::Measurement;

#[derive(Debug, Error)]
pub enum SensorError {
    /// Checksum/parity-style failure on the bus. Recoverable on the next read.
    #[error("sensor transport read failed: {0}")]
    Transport(String),
}

/// Environmental sensor driver. Calls may come from several tasks at once.
pub trait SampleSource: Send + Sync {
    /// False while the sensor has no fresh measurement ready.
    fn data_available(&self) -> bool;

    fn read_reading(&self) -> Result<Measurement, SensorError>;
}

/// Wall-clock source for reading timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}
