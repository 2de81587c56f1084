pub mod debounce;
pub mod prompt;
pub mod signals;

pub use debounce::{Debouncer, Level, RawSignal};
pub use prompt::{ConfirmationPrompt, PromptAnswer};
pub use signals::{spawn_trigger_signals, wait_for_termination};
