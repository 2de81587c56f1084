use std::sync::Arc;

use anyhow::Context;

use crate::feedback::{Feedback, Lamp};
use crate::log_store::LogAppender;
use crate::models::{reading::TIMESTAMP_FORMAT, Reading};

use super::sample::sample;
use super::source::{Clock, SampleSource};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Written(Reading),
    /// Sensor had no data ready; nothing written.
    Skipped,
    /// Sampled, but the append failed. Already reported.
    WriteFailed,
}

impl RecordOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, RecordOutcome::Written(_))
    }
}

/// Sample-then-append, shared by the periodic sampler and override sessions.
///
/// Errors stop here: nothing returned by `record` can terminate a caller's loop.
#[derive(Clone)]
pub struct Recorder {
    source: Arc<dyn SampleSource>,
    log: Arc<dyn LogAppender>,
    clock: Arc<dyn Clock>,
    feedback: Feedback,
}

impl Recorder {
    pub fn new(
        source: Arc<dyn SampleSource>,
        log: Arc<dyn LogAppender>,
        clock: Arc<dyn Clock>,
        feedback: Feedback,
    ) -> Self {
        Self {
            source,
            log,
            clock,
            feedback,
        }
    }

    /// Sample once and append the result. Sensor and file I/O run on the
    /// blocking pool; once started, the call always runs to completion.
    pub async fn record(&self, comment: &str) -> RecordOutcome {
        let sampled = tokio::task::spawn_blocking({
            let source = Arc::clone(&self.source);
            let clock = Arc::clone(&self.clock);
            let comment = comment.to_string();
            move || sample(source.as_ref(), clock.as_ref(), &comment)
        })
        .await;

        let reading = match sampled {
            Ok(Some(reading)) => reading,
            Ok(None) => return RecordOutcome::Skipped,
            Err(err) => {
                log_error!("sensor read worker join failed: {err}");
                return RecordOutcome::Skipped;
            }
        };

        self.feedback.flash(Lamp::Sample);
        log_info!(
            "Time: {} Co2: {:?}, Temp: {:?}, Rel. hum: {:?}, Comment: {}",
            reading.timestamp.format(TIMESTAMP_FORMAT),
            reading.co2,
            reading.temperature,
            reading.humidity,
            reading.comment
        );

        let appended = tokio::task::spawn_blocking({
            let log = Arc::clone(&self.log);
            let record = reading.to_record();
            move || log.append(&record)
        })
        .await
        .context("log append worker join failed");

        match appended.and_then(|result| result) {
            Ok(()) => RecordOutcome::Written(reading),
            Err(err) => {
                log_error!("failed to append reading ({}): {err:#}", reading.comment);
                RecordOutcome::WriteFailed
            }
        }
    }

    pub fn feedback(&self) -> &Feedback {
        &self.feedback
    }

    pub fn writer_busy(&self) -> bool {
        self.log.is_busy()
    }
}
