use std::sync::Mutex;

use rand::Rng;

use crate::models::Measurement;
use crate::settings::SensorSettings;

use super::source::{SampleSource, SensorError};

/// Random-walk stand-in for the SCD30 driver, for running without hardware.
///
/// Honors the configured not-ready and transport-failure rates so the
/// skip and unreadable paths get exercised in the field log too.
pub struct SimulatedSensor {
    settings: SensorSettings,
    state: Mutex<Measurement>,
}

impl SimulatedSensor {
    pub fn new(settings: SensorSettings) -> Self {
        Self {
            settings,
            state: Mutex::new(Measurement {
                co2: 450.0,
                temperature: 21.0,
                humidity: 40.0,
            }),
        }
    }
}

impl SampleSource for SimulatedSensor {
    fn data_available(&self) -> bool {
        !rand::thread_rng().gen_bool(self.settings.not_ready_rate)
    }

    fn read_reading(&self) -> Result<Measurement, SensorError> {
        let mut rng = rand::thread_rng();
        if rng.gen_bool(self.settings.failure_rate) {
            return Err(SensorError::Transport("CRC mismatch".into()));
        }

        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.co2 = (state.co2 + rng.gen_range(-15.0..15.0)).clamp(400.0, 2500.0);
        state.temperature = (state.temperature + rng.gen_range(-0.2..0.2)).clamp(10.0, 35.0);
        state.humidity = (state.humidity + rng.gen_range(-0.5..0.5)).clamp(10.0, 90.0);

        Ok(Measurement {
            co2: round_to(state.co2, 1),
            temperature: round_to(state.temperature, 2),
            humidity: round_to(state.humidity, 2),
        })
    }
}

fn round_to(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round() / scale
}
