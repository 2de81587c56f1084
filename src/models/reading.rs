//! Reading data model.
//!
//! A single row of the sensor log. Numeric fields are optional so the log can
//! tell "we tried and it was unreadable" apart from "we never tried".

use chrono::{DateTime, Local};

/// ISO-8601 local time with microsecond precision.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

const MISSING_VALUE: &str = "None";

/// Raw values returned by a successful sensor read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub co2: f64,
    pub temperature: f64,
    pub humidity: f64,
}

/// One sample attempt, consumed immediately by the log appender.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub timestamp: DateTime<Local>,
    pub co2: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub comment: String,
}

impl Reading {
    pub fn from_measurement(
        timestamp: DateTime<Local>,
        measurement: Measurement,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            co2: Some(measurement.co2),
            temperature: Some(measurement.temperature),
            humidity: Some(measurement.humidity),
            comment: comment.into(),
        }
    }

    /// A reading whose transport read failed. Written with every value absent.
    pub fn unreadable(timestamp: DateTime<Local>, comment: impl Into<String>) -> Self {
        Self {
            timestamp,
            co2: None,
            temperature: None,
            humidity: None,
            comment: comment.into(),
        }
    }

    pub fn is_unreadable(&self) -> bool {
        self.co2.is_none() && self.temperature.is_none() && self.humidity.is_none()
    }

    /// Serialize as one log row, newline included.
    pub fn to_record(&self) -> String {
        format!(
            "{},{},{},{},{}\n",
            self.timestamp.format(TIMESTAMP_FORMAT),
            format_value(self.co2),
            format_value(self.temperature),
            format_value(self.humidity),
            sanitize_comment(&self.comment),
        )
    }
}

// Debug keeps the shortest round-trip form and always a decimal point (40.0, 412.3).
fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:?}"),
        None => MISSING_VALUE.to_string(),
    }
}

fn sanitize_comment(comment: &str) -> String {
    comment.replace([',', '\n', '\r'], " ")
}
