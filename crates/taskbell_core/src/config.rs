//! Engine configuration.
//!
//! Defaults are serialized into figment, then overlaid by an optional TOML
//! file and `TASKBELL_`-prefixed environment variables. Load problems fall
//! back to defaults with a warning; nothing here aborts startup.

use crate::executor::scheduler::DEFAULT_CHECK_INTERVAL;
use crate::logging::default_log_level;
use crate::platform::registration::{
    PeriodicWakeRegistration, PERIODIC_WAKE_MIN_INTERVAL, PERIODIC_WAKE_TAG,
};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const ENV_PREFIX: &str = "TASKBELL_";
pub const DEFAULT_DB_FILE_NAME: &str = "taskbell.sqlite3";
const DEFAULT_RUNTIME_READY_TIMEOUT_SECS: u64 = 5;
const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Foreground timer period.
    pub check_interval_secs: u64,
    /// Requested minimum periodic wake interval.
    pub periodic_wake_interval_secs: u64,
    /// Bound on waiting for the background runtime before a direct display.
    pub runtime_ready_timeout_secs: u64,
    pub periodic_wake_tag: String,
    pub log_level: String,
    pub db_file_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: DEFAULT_CHECK_INTERVAL.as_secs(),
            periodic_wake_interval_secs: PERIODIC_WAKE_MIN_INTERVAL.as_secs(),
            runtime_ready_timeout_secs: DEFAULT_RUNTIME_READY_TIMEOUT_SECS,
            periodic_wake_tag: PERIODIC_WAKE_TAG.to_string(),
            log_level: default_log_level().to_string(),
            db_file_name: DEFAULT_DB_FILE_NAME.to_string(),
        }
    }
}

impl EngineConfig {
    /// Loads defaults ← `config_path` (if present) ← environment.
    pub fn load(config_path: Option<&Path>) -> Self {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX));
        Self::extract(figment)
    }

    /// Parses an inline TOML document over the defaults.
    pub fn from_toml_str(toml: &str) -> Self {
        Self::extract(Figment::from(Serialized::defaults(Self::default())).merge(Toml::string(toml)))
    }

    fn extract(figment: Figment) -> Self {
        let mut config: Self = figment.extract().unwrap_or_else(|err| {
            warn!("event=config_load module=config status=error fallback=defaults error={err}");
            Self::default()
        });
        config.ensure_valid();
        config
    }

    fn ensure_valid(&mut self) {
        let defaults = Self::default();

        if self.check_interval_secs == 0 {
            warn!("event=config_validate module=config status=fixed field=check_interval_secs");
            self.check_interval_secs = defaults.check_interval_secs;
        }
        if self.periodic_wake_interval_secs == 0 {
            warn!("event=config_validate module=config status=fixed field=periodic_wake_interval_secs");
            self.periodic_wake_interval_secs = defaults.periodic_wake_interval_secs;
        }
        if self.runtime_ready_timeout_secs == 0 {
            warn!("event=config_validate module=config status=fixed field=runtime_ready_timeout_secs");
            self.runtime_ready_timeout_secs = defaults.runtime_ready_timeout_secs;
        }
        if self.periodic_wake_tag.trim().is_empty() {
            warn!("event=config_validate module=config status=fixed field=periodic_wake_tag");
            self.periodic_wake_tag = defaults.periodic_wake_tag;
        }
        if self.db_file_name.trim().is_empty() {
            warn!("event=config_validate module=config status=fixed field=db_file_name");
            self.db_file_name = defaults.db_file_name;
        }

        let level = self.log_level.trim().to_ascii_lowercase();
        if LOG_LEVELS.contains(&level.as_str()) {
            self.log_level = level;
        } else {
            warn!("event=config_validate module=config status=fixed field=log_level");
            self.log_level = defaults.log_level;
        }
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn runtime_ready_timeout(&self) -> Duration {
        Duration::from_secs(self.runtime_ready_timeout_secs)
    }

    pub fn periodic_wake(&self) -> PeriodicWakeRegistration {
        PeriodicWakeRegistration {
            tag: self.periodic_wake_tag.clone(),
            min_interval: Duration::from_secs(self.periodic_wake_interval_secs),
        }
    }
}
