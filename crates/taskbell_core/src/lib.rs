//! Local notification engine for the task board.
//!
//! Compiles task deadlines and a daily summary into a persistent schedule,
//! and delivers due entries from whichever execution context is awake.

pub mod clock;
pub mod config;
pub mod db;
pub mod executor;
pub mod logging;
pub mod model;
pub mod platform;
pub mod repo;
pub mod schedule;
pub mod service;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use executor::background::{BackgroundWorker, WakeOutcome};
pub use executor::bridge::{BackgroundToForeground, ForegroundToBackground, MessageBridge};
pub use executor::check::{check_and_execute, CheckReport};
pub use executor::scheduler::ForegroundScheduler;
pub use executor::{CheckTrigger, DeliveryExecutor, ExecutionContext};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::notification::{NotificationPayload, NotificationType, ScheduledNotification};
pub use model::settings::{
    DailySummaryPatch, DeadlineReminderPatch, NotificationSettings, NotificationSettingsPatch,
    SettingsValidationError,
};
pub use model::task::Task;
pub use platform::capability::{CapabilitySet, PlatformCapability, RuntimeSupport, UnsupportedReason};
pub use platform::permission::PermissionState;
pub use platform::registration::{
    PeriodicWakeRegistration, RegistrationManager, RegistrationOutcome, RuntimeReadiness,
};
pub use platform::{DisplayError, NotificationDisplay, NotificationPlatform, PlatformError};
pub use repo::notification_store::NotificationStore;
pub use repo::schedule_repo::{RepoError, RepoResult};
pub use repo::settings_repo::SettingsStore;
pub use schedule::recompute::ScheduleCompiler;
pub use service::notification_service::{
    NotificationService, NotificationStatus, NotifyError, NotifyResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
