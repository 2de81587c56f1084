mod feedback;
mod input;
mod log_store;
mod models;
mod scheduler;
mod sensing;
mod settings;
mod utils;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

pub use feedback::{Feedback, Indicator, Lamp, LogIndicator};
pub use input::{ConfirmationPrompt, Debouncer, Level, PromptAnswer, RawSignal};
pub use log_store::{CsvLog, LogAppender, COLUMN_HEADER};
pub use models::{Measurement, Reading, TriggerEvent, TriggerKind};
pub use scheduler::{
    OverrideConfig, Scheduler, SchedulerError, SchedulerStatus, SessionHandle, SessionPhase,
};
pub use sensing::{
    sample, Clock, PeriodicSampler, RecordOutcome, Recorder, SampleSource, SensorError,
    SimulatedSensor, SystemClock, TickOutcome,
};
pub use settings::{
    ConfirmationMapping, SensorSettings, Settings, TriggerProfile, TriggerProfiles,
};

/// Process entry point: logging, settings, runtime, then [`serve`].
pub fn run() -> Result<()> {
    // Info by default; RUST_LOG still wins.
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    log::info!("co2-logger starting up...");

    let settings = Settings::from_env()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(serve(settings))
}

/// Wire sampler, scheduler and trigger inputs together and run until SIGINT
/// or SIGTERM.
pub async fn serve(settings: Settings) -> Result<()> {
    let log = Arc::new(CsvLog::open(&settings.log_path, &settings.log_title)?);
    let feedback = Feedback::new(Arc::new(LogIndicator), settings.feedback_hold());
    let recorder = Recorder::new(
        Arc::new(SimulatedSensor::new(settings.sensor.clone())),
        log,
        Arc::new(SystemClock),
        feedback,
    );

    let prompt = settings
        .triggers
        .any_confirmation()
        .then(|| Arc::new(ConfirmationPrompt::from_stdin()));

    let scheduler = Scheduler::new(recorder, settings.override_config(), prompt);

    let periodic = PeriodicSampler::new(
        scheduler.clone(),
        settings.periodic_interval(),
        settings.periodic_comment.clone(),
    )
    .spawn();

    let (raw_tx, raw_rx) = mpsc::channel(32);
    let (event_tx, event_rx) = mpsc::channel(8);
    let debouncer = tokio::spawn(Debouncer::new(settings.debounce_settle()).run(
        raw_rx,
        event_tx,
        scheduler.shutdown_token(),
    ));
    let triggers = input::spawn_trigger_signals(raw_tx, scheduler.shutdown_token())?;
    let listener = tokio::spawn(scheduler.clone().listen(event_rx));

    log::info!(
        "Sampling every {}s; override sessions every {}s for {}s",
        settings.periodic_interval_secs,
        settings.override_interval_secs,
        settings.override_duration_secs
    );

    input::wait_for_termination().await?;
    log::info!("Termination requested; shutting down");

    scheduler.shutdown().await;
    for (name, task) in [
        ("periodic sampler", periodic),
        ("debouncer", debouncer),
        ("trigger signals", triggers),
        ("trigger listener", listener),
    ] {
        if let Err(err) = task.await {
            log::error!("{name} task failed to join: {err}");
        }
    }

    let status = scheduler.status();
    log::info!(
        "co2-logger stopped: {}",
        serde_json::to_string(&status).unwrap_or_else(|_| format!("{status:?}"))
    );
    Ok(())
}
