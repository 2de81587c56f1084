use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::models::TriggerKind;
use crate::scheduler::OverrideConfig;

/// Environment variable naming the JSON settings file.
pub const CONFIG_ENV_VAR: &str = "CO2_LOGGER_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "co2_logger.json";

/// Maps an operator's answer to a comment for the triggered session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationMapping {
    pub question: String,
    /// Comment used when the operator typed anything.
    pub on_input: String,
    /// Comment used when the operator just pressed enter.
    pub on_empty: String,
}

impl Default for ConfirmationMapping {
    fn default() -> Self {
        Self {
            question: "[C]losing, else opening will be activated".into(),
            on_input: "closing".into(),
            on_empty: "opening".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerProfile {
    /// Comment written with every override sample. Also the fallback when a
    /// confirmation prompt times out.
    pub comment: String,
    #[serde(default)]
    pub confirmation: Option<ConfirmationMapping>,
}

impl TriggerProfile {
    fn plain(comment: &str) -> Self {
        Self {
            comment: comment.into(),
            confirmation: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerProfiles {
    pub close: TriggerProfile,
    pub open: TriggerProfile,
    pub generic: TriggerProfile,
}

impl Default for TriggerProfiles {
    fn default() -> Self {
        Self {
            close: TriggerProfile::plain("closed"),
            open: TriggerProfile::plain("opened"),
            generic: TriggerProfile {
                comment: "opening".into(),
                confirmation: Some(ConfirmationMapping::default()),
            },
        }
    }
}

impl TriggerProfiles {
    pub fn get(&self, kind: TriggerKind) -> &TriggerProfile {
        match kind {
            TriggerKind::Close => &self.close,
            TriggerKind::Open => &self.open,
            TriggerKind::Generic => &self.generic,
        }
    }

    pub fn any_confirmation(&self) -> bool {
        [&self.close, &self.open, &self.generic]
            .iter()
            .any(|profile| profile.confirmation.is_some())
    }
}

/// Knobs for the simulated sensor used when no hardware driver is wired in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorSettings {
    pub failure_rate: f64,
    pub not_ready_rate: f64,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            failure_rate: 0.05,
            not_ready_rate: 0.02,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub log_path: PathBuf,
    pub log_title: String,
    pub periodic_interval_secs: u64,
    pub periodic_comment: String,
    pub override_interval_secs: u64,
    pub override_duration_secs: u64,
    pub confirmation_timeout_secs: u64,
    pub debounce_settle_ms: u64,
    pub feedback_hold_secs: u64,
    pub sensor: SensorSettings,
    pub triggers: TriggerProfiles,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("temp_humidity_co2_logger.txt"),
            log_title: "SCD30 sensor".into(),
            periodic_interval_secs: 900,
            periodic_comment: "none".into(),
            override_interval_secs: 60,
            override_duration_secs: 30 * 60,
            confirmation_timeout_secs: 10,
            debounce_settle_ms: 500,
            feedback_hold_secs: 3,
            sensor: SensorSettings::default(),
            triggers: TriggerProfiles::default(),
        }
    }
}

impl Settings {
    /// Resolve settings from `CO2_LOGGER_CONFIG`, then `./co2_logger.json`,
    /// then built-in defaults.
    pub fn from_env() -> Result<Self> {
        if let Some(path) = env::var_os(CONFIG_ENV_VAR) {
            return Self::load(Path::new(&path));
        }

        let fallback = Path::new(DEFAULT_CONFIG_FILE);
        if fallback.exists() {
            return Self::load(fallback);
        }

        log::info!("No settings file found; using built-in defaults");
        let settings = Self::default();
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&contents)
            .with_context(|| format!("Malformed settings in {}", path.display()))?;
        settings
            .validate()
            .with_context(|| format!("Invalid settings in {}", path.display()))?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("periodic_interval_secs", self.periodic_interval_secs),
            ("override_interval_secs", self.override_interval_secs),
            ("override_duration_secs", self.override_duration_secs),
            ("debounce_settle_ms", self.debounce_settle_ms),
        ] {
            if value == 0 {
                bail!("{name} must be greater than zero");
            }
        }

        if self.log_path.as_os_str().is_empty() {
            bail!("log_path must not be empty");
        }
        if let Some(parent) = self.log_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                bail!(
                    "log directory {} does not exist",
                    parent.display()
                );
            }
        }

        for (name, rate) in [
            ("sensor.failure_rate", self.sensor.failure_rate),
            ("sensor.not_ready_rate", self.sensor.not_ready_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                bail!("{name} must be within [0, 1], got {rate}");
            }
        }

        Ok(())
    }

    pub fn periodic_interval(&self) -> Duration {
        Duration::from_secs(self.periodic_interval_secs)
    }

    pub fn debounce_settle(&self) -> Duration {
        Duration::from_millis(self.debounce_settle_ms)
    }

    pub fn feedback_hold(&self) -> Duration {
        Duration::from_secs(self.feedback_hold_secs)
    }

    pub fn override_config(&self) -> OverrideConfig {
        OverrideConfig {
            interval: Duration::from_secs(self.override_interval_secs),
            duration: Duration::from_secs(self.override_duration_secs),
            confirmation_timeout: Duration::from_secs(self.confirmation_timeout_secs),
            triggers: self.triggers.clone(),
        }
    }
}
