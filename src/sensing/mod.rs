pub mod loop_worker;
pub mod recorder;
pub mod sample;
pub mod simulated;
pub mod source;

pub use loop_worker::{PeriodicSampler, TickOutcome};
pub use recorder::{RecordOutcome, Recorder};
pub use sample::sample;
pub use simulated::SimulatedSensor;
pub use source::{Clock, SampleSource, SensorError, SystemClock};
