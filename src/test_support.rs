//! Fakes shared by the unit tests.

use std::collections::VecDeque;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use anyhow::{bail, Result};
use chrono::{DateTime, Local, TimeZone};

use crate::feedback::{Feedback, Indicator, Lamp};
use crate::input::ConfirmationPrompt;
use crate::log_store::LogAppender;
use crate::models::Measurement;
use crate::scheduler::{OverrideConfig, Scheduler};
use crate::sensing::{Clock, Recorder, SampleSource, SensorError};

pub fn measurement(co2: f64, temperature: f64, humidity: f64) -> Measurement {
    Measurement {
        co2,
        temperature,
        humidity,
    }
}

pub fn base_time() -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    NotReady,
    Fail,
    Value(Measurement),
}

/// Sensor that plays back a script, then repeats a fallback step forever.
pub struct ScriptedSource {
    script: Mutex<VecDeque<Step>>,
    fallback: Step,
    reads: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: Step::NotReady,
            reads: AtomicUsize::new(0),
        }
    }

    pub fn repeating(step: Step) -> Self {
        Self {
            fallback: step,
            ..Self::new(Vec::new())
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn front(&self) -> Step {
        self.script
            .lock()
            .unwrap()
            .front()
            .copied()
            .unwrap_or(self.fallback)
    }

    fn advance(&self) -> Step {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback)
    }
}

impl SampleSource for ScriptedSource {
    fn data_available(&self) -> bool {
        if self.front() == Step::NotReady {
            self.advance();
            return false;
        }
        true
    }

    fn read_reading(&self) -> Result<Measurement, SensorError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        match self.advance() {
            Step::Value(m) => Ok(m),
            Step::Fail | Step::NotReady => Err(SensorError::Transport("CRC mismatch".into())),
        }
    }
}

/// Sensor whose reads block the calling thread for `delay`, tracking how many
/// reads overlap.
pub struct SlowSource {
    delay: Duration,
    value: Measurement,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl SlowSource {
    pub fn new(delay: Duration, value: Measurement) -> Self {
        Self {
            delay,
            value,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl SampleSource for SlowSource {
    fn data_available(&self) -> bool {
        true
    }

    fn read_reading(&self) -> Result<Measurement, SensorError> {
        let overlapping = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(overlapping, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(self.value)
    }
}

/// In-memory appender with switchable failure.
#[derive(Default)]
pub struct MemoryLog {
    rows: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl MemoryLog {
    pub fn rows(&self) -> Vec<String> {
        self.rows.lock().unwrap().clone()
    }

    pub fn comments(&self) -> Vec<String> {
        self.rows()
            .iter()
            .map(|row| row.trim_end().rsplit(',').next().unwrap_or("").to_string())
            .collect()
    }

    pub fn fail_appends(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl LogAppender for MemoryLog {
    fn append(&self, record: &str) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("disk full");
        }
        self.rows.lock().unwrap().push(record.to_string());
        Ok(())
    }
}

/// Wall clock pinned to `base_time()` plus elapsed (possibly paused) tokio time.
pub struct TokioClock {
    base: DateTime<Local>,
    start: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            base: base_time(),
            start: tokio::time::Instant::now(),
        }
    }

    pub fn at(&self, instant: tokio::time::Instant) -> DateTime<Local> {
        let offset = instant.duration_since(self.start);
        self.base + chrono::Duration::from_std(offset).unwrap()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Local> {
        self.at(tokio::time::Instant::now())
    }
}

/// Clock that moves one second forward on every call.
#[derive(Default)]
pub struct SteppingClock {
    calls: AtomicUsize,
}

impl SteppingClock {
    /// The value the next `now()` call will return.
    pub fn peek(&self) -> DateTime<Local> {
        base_time() + chrono::Duration::seconds(self.calls() as i64)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Local> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        base_time() + chrono::Duration::seconds(n as i64)
    }
}

#[derive(Default)]
pub struct RecordingIndicator {
    transitions: Mutex<Vec<(Lamp, bool)>>,
}

impl RecordingIndicator {
    pub fn transitions(&self) -> Vec<(Lamp, bool)> {
        self.transitions.lock().unwrap().clone()
    }
}

impl Indicator for RecordingIndicator {
    fn set(&self, lamp: Lamp, on: bool) {
        self.transitions.lock().unwrap().push((lamp, on));
    }
}

pub fn recorder(source: Arc<dyn SampleSource>, log: Arc<dyn LogAppender>) -> Recorder {
    Recorder::new(
        source,
        log,
        Arc::new(TokioClock::new()),
        Feedback::new(Arc::new(RecordingIndicator::default()), Duration::from_secs(3)),
    )
}

pub fn scheduler(recorder: Recorder, prompt: Option<Arc<ConfirmationPrompt>>) -> Scheduler {
    Scheduler::new(recorder, OverrideConfig::default(), prompt)
}
