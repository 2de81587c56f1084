pub mod controller;
pub mod session;
pub mod state;


pub use controller::{OverrideConfig, Scheduler, SchedulerError};
pub use session::SessionHandle;
pub use state::{SchedulerStatus, SessionPhase};
