use crate::models::Reading;

use super::source::{Clock, SampleSource};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Attempt one reading.
///
/// Returns `None` when the sensor has nothing ready; the caller must not write
/// a row. A transport failure still yields a reading, with every value absent
/// and `comment` preserved, so the log shows the attempt.
pub fn sample(source: &dyn SampleSource, clock: &dyn Clock, comment: &str) -> Option<Reading> {
    if !source.data_available() {
        log_debug!("sensor reports no data ready; skipping sample ({comment})");
        return None;
    }

    // Captured before the read so the logged instant does not drift with I/O time.
    let timestamp = clock.now();

    match source.read_reading() {
        Ok(measurement) => Some(Reading::from_measurement(timestamp, measurement, comment)),
        Err(err) => {
            log_warn!("unreadable sample at {}: {err}", timestamp.to_rfc3339());
            Some(Reading::unreadable(timestamp, comment))
        }
    }
}
