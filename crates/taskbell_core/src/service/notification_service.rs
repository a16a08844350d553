//! Notification use-case service for the settings UI and task board.
//!
//! # Responsibility
//! - Drive the permission flow and background registration on enable.
//! - Persist settings and trigger event-driven recomputes.
//! - Own the foreground timer lifecycle.
//!
//! # Invariants
//! - `settings.enabled` only becomes `true` after permission is granted and
//!   the runtime registration succeeded.
//! - Disabling never purges the stored schedule and never unregisters the
//!   background runtime.
//! - Recomputes only happen while enabled.

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::executor::bridge::{ForegroundToBackground, MessageBridge};
use crate::executor::scheduler::ForegroundScheduler;
use crate::executor::{DeliveryExecutor, ExecutionContext};
use crate::model::notification::{test_payload, ScheduledNotification};
use crate::model::settings::{
    NotificationSettings, NotificationSettingsPatch, SettingsValidationError,
};
use crate::model::task::Task;
use crate::platform::capability::{RuntimeSupport, UnsupportedReason};
use crate::platform::permission::PermissionState;
use crate::platform::registration::{RegistrationManager, RegistrationOutcome};
use crate::platform::{DisplayError, NotificationPlatform, PlatformError};
use crate::repo::notification_store::NotificationStore;
use crate::repo::schedule_repo::RepoError;
use crate::repo::settings_repo::SettingsStore;
use crate::schedule::recompute::ScheduleCompiler;
use log::{info, warn};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Shown when the background runtime does not come up in time.
pub const RUNTIME_NOT_READY_MESSAGE: &str =
    "通知の準備ができていません。しばらくしてから再度お試しください。";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notifications unavailable: {0}")]
    Unsupported(UnsupportedReason),
    #[error("notification permission denied")]
    PermissionDenied,
    #[error("{message}")]
    RuntimeNotReady { message: String },
    #[error("background runtime registration failed: {0}")]
    Registration(PlatformError),
    #[error(transparent)]
    InvalidSettings(#[from] SettingsValidationError),
    #[error("settings could not be saved: {0}")]
    Settings(#[from] RepoError),
    #[error(transparent)]
    Display(#[from] DisplayError),
}

pub type NotifyResult<T> = Result<T, NotifyError>;

/// Snapshot rendered by the settings screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationStatus {
    pub supported: bool,
    pub permission: PermissionState,
    pub enabled: bool,
    pub scheduled_count: usize,
}

pub struct NotificationService {
    registration: RegistrationManager,
    store: Arc<NotificationStore>,
    settings_store: SettingsStore,
    compiler: ScheduleCompiler,
    scheduler: ForegroundScheduler,
    bridge: Arc<MessageBridge>,
    config: EngineConfig,
    settings: Mutex<NotificationSettings>,
    tasks: Mutex<Vec<Task>>,
}

impl NotificationService {
    pub fn new(
        platform: Arc<dyn NotificationPlatform>,
        store: Arc<NotificationStore>,
        settings_store: SettingsStore,
        bridge: Arc<MessageBridge>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        let executor = DeliveryExecutor::new(
            Arc::clone(&store),
            Arc::clone(&platform),
            Arc::clone(&clock),
            ExecutionContext::Foreground,
        );
        let scheduler =
            ForegroundScheduler::new(executor, Arc::clone(&bridge), config.check_interval());
        let settings = settings_store.load_or_default();

        Self {
            registration: RegistrationManager::new(platform),
            compiler: ScheduleCompiler::new(Arc::clone(&store), clock),
            store,
            settings_store,
            scheduler,
            bridge,
            config,
            settings: Mutex::new(settings),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Opens schedule and settings storage under `db_path`.
    pub fn open(
        db_path: impl AsRef<Path>,
        platform: Arc<dyn NotificationPlatform>,
        bridge: Arc<MessageBridge>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        let db_path = db_path.as_ref();
        Self::new(
            platform,
            Arc::new(NotificationStore::open(db_path)),
            SettingsStore::open(db_path),
            bridge,
            clock,
            config,
        )
    }

    pub fn registration(&self) -> &RegistrationManager {
        &self.registration
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Restarts delivery after a page load when the stored switch is on and
    /// permission still holds.
    pub fn resume(&self) -> bool {
        if !self.settings().enabled {
            return false;
        }
        if !self.registration.permission_state().is_granted() {
            info!("event=notify_resume module=service status=skip reason=permission");
            return false;
        }
        if !matches!(
            self.registration.register_runtime(),
            RegistrationOutcome::Registered(_)
        ) {
            return false;
        }
        self.registration
            .subscribe_periodic_wake(self.config.periodic_wake());
        self.scheduler.start()
    }

    /// Runs the permission flow and turns delivery on.
    ///
    /// Returns `false` when unsupported, denied, dismissed, or when the
    /// runtime could not be registered; `settings.enabled` is unchanged then.
    pub fn enable_notifications(&self) -> bool {
        if let RuntimeSupport::Unsupported(reason) = self.registration.support() {
            info!("event=notify_enable module=service status=skip reason=\"{reason}\"");
            return false;
        }

        let permission = self.registration.request_permission();
        if !permission.is_granted() {
            info!(
                "event=notify_enable module=service status=skip permission={}",
                permission.as_str()
            );
            return false;
        }

        match self.registration.register_runtime() {
            RegistrationOutcome::Registered(_) => {}
            RegistrationOutcome::Unsupported(reason) => {
                warn!("event=notify_enable module=service status=error reason=\"{reason}\"");
                return false;
            }
            RegistrationOutcome::Failed(err) => {
                warn!("event=notify_enable module=service status=error error={err}");
                return false;
            }
        }
        self.registration
            .subscribe_periodic_wake(self.config.periodic_wake());

        let settings = {
            let mut settings = self.lock_settings();
            let mut next = settings.clone();
            next.enabled = true;
            if let Err(err) = self.settings_store.save(&next) {
                warn!("event=notify_enable module=service status=error error={err}");
                return false;
            }
            *settings = next.clone();
            next
        };

        self.scheduler.start();
        let tasks = self.lock_tasks().clone();
        self.compiler.recompute_all(&tasks, &settings);
        self.bridge.post_to_background(ForegroundToBackground::RunCheck);
        info!("event=notify_enable module=service status=ok");
        true
    }

    /// Turns delivery off. Pending entries stay in the store.
    pub fn disable_notifications(&self) -> bool {
        self.scheduler.stop();
        self.registration.unsubscribe_periodic_wake();

        let mut settings = self.lock_settings();
        let mut next = settings.clone();
        next.enabled = false;
        match self.settings_store.save(&next) {
            Ok(()) => {
                *settings = next;
                info!("event=notify_disable module=service status=ok");
                true
            }
            Err(err) => {
                warn!("event=notify_disable module=service status=error error={err}");
                false
            }
        }
    }

    /// Applies a partial update, persists it, and recomputes when enabled.
    pub fn update_settings(
        &self,
        patch: &NotificationSettingsPatch,
    ) -> NotifyResult<NotificationSettings> {
        let next = {
            let mut settings = self.lock_settings();
            let next = settings.apply_patch(patch)?;
            self.settings_store.save(&next)?;
            *settings = next.clone();
            next
        };

        if next.enabled {
            let tasks = self.lock_tasks().clone();
            self.compiler.recompute_all(&tasks, &next);
        }
        info!(
            "event=settings_update module=service status=ok enabled={}",
            next.enabled
        );
        Ok(next)
    }

    /// Shows the fixed test notification immediately, bypassing the schedule.
    ///
    /// Waits for the background runtime at most `runtime_ready_timeout`.
    pub fn send_test_notification(&self) -> NotifyResult<()> {
        if let RuntimeSupport::Unsupported(reason) = self.registration.support() {
            return Err(NotifyError::Unsupported(reason));
        }
        if !self.registration.permission_state().is_granted() {
            return Err(NotifyError::PermissionDenied);
        }

        let readiness = match self.registration.register_runtime() {
            RegistrationOutcome::Registered(readiness) => readiness,
            RegistrationOutcome::Unsupported(reason) => {
                return Err(NotifyError::Unsupported(reason))
            }
            RegistrationOutcome::Failed(err) => return Err(NotifyError::Registration(err)),
        };

        let timeout = self.config.runtime_ready_timeout();
        if !readiness.wait_ready(timeout) {
            warn!(
                "event=notify_test module=service status=error reason=runtime_not_ready timeout_ms={}",
                timeout.as_millis()
            );
            return Err(NotifyError::RuntimeNotReady {
                message: RUNTIME_NOT_READY_MESSAGE.to_string(),
            });
        }

        self.registration.platform().show(&test_payload())?;
        info!("event=notify_test module=service status=ok");
        Ok(())
    }

    pub fn get_scheduled_notifications(&self) -> Vec<ScheduledNotification> {
        self.store.get_all()
    }

    /// Records the latest task list and recomputes both axes when enabled.
    pub fn on_tasks_changed(&self, tasks: &[Task]) -> Vec<ScheduledNotification> {
        *self.lock_tasks() = tasks.to_vec();
        let settings = self.settings();
        if !settings.enabled {
            return Vec::new();
        }
        self.compiler.recompute_all(tasks, &settings)
    }

    /// Asks the background runtime to run a pass against its own handle.
    pub fn request_background_check(&self) -> bool {
        self.bridge.post_to_background(ForegroundToBackground::RunCheck)
    }

    pub fn settings(&self) -> NotificationSettings {
        self.lock_settings().clone()
    }

    pub fn status(&self) -> NotificationStatus {
        NotificationStatus {
            supported: self.registration.support().is_supported(),
            permission: self.registration.permission_state(),
            enabled: self.settings().enabled,
            scheduled_count: self.store.get_all().len(),
        }
    }

    pub fn is_delivering(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Stops the foreground timer for good.
    pub fn dispose(&self) {
        self.scheduler.dispose();
    }

    fn lock_settings(&self) -> MutexGuard<'_, NotificationSettings> {
        self.settings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_tasks(&self) -> MutexGuard<'_, Vec<Task>> {
        self.tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
