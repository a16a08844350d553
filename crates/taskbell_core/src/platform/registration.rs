//! Permission and background-runtime registration manager.
//!
//! # Responsibility
//! - Hold the one-shot capability probe and gate every registration on it.
//! - Drive the permission state machine without re-prompting a denial.
//! - Register the background runtime (idempotent) and the periodic wake.
//!
//! # Invariants
//! - An `Unsupported` probe short-circuits every call with an explicit
//!   signal; the platform is never asked for a missing capability.
//! - Unsubscribing the periodic wake never unregisters the runtime, which
//!   other features depend on.

use super::capability::{PlatformCapability, RuntimeSupport, UnsupportedReason};
use super::permission::PermissionState;
use super::{NotificationPlatform, PlatformError};
use log::{info, warn};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Tag of the periodic background wake that runs delivery checks.
pub const PERIODIC_WAKE_TAG: &str = "check-notifications";
/// Requested minimum interval between periodic wakes.
pub const PERIODIC_WAKE_MIN_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Periodic wake subscription request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodicWakeRegistration {
    pub tag: String,
    pub min_interval: Duration,
}

impl Default for PeriodicWakeRegistration {
    fn default() -> Self {
        Self {
            tag: PERIODIC_WAKE_TAG.to_string(),
            min_interval: PERIODIC_WAKE_MIN_INTERVAL,
        }
    }
}

/// Readiness latch of the background runtime.
///
/// The background worker calls [`RuntimeReadiness::mark_ready`] once it is
/// running; the foreground waits on it with a bound.
#[derive(Debug, Clone, Default)]
pub struct RuntimeReadiness {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl RuntimeReadiness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_ready(&self) {
        let (lock, ready_cv) = &*self.inner;
        let mut ready = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *ready = true;
        ready_cv.notify_all();
    }

    pub fn is_ready(&self) -> bool {
        *self
            .inner
            .0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Blocks until ready or `timeout` elapses; returns readiness.
    pub fn wait_ready(&self, timeout: Duration) -> bool {
        let (lock, ready_cv) = &*self.inner;
        let guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let (guard, _) = ready_cv
            .wait_timeout_while(guard, timeout, |ready| !*ready)
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard
    }
}

/// Outcome of a background-runtime registration.
#[derive(Debug, Clone)]
pub enum RegistrationOutcome {
    Registered(RuntimeReadiness),
    Unsupported(UnsupportedReason),
    Failed(PlatformError),
}

/// Permission and registration state owned by the composing application.
pub struct RegistrationManager {
    platform: Arc<dyn NotificationPlatform>,
    support: RuntimeSupport,
    runtime: Mutex<Option<RuntimeReadiness>>,
    periodic_wake: Mutex<Option<PeriodicWakeRegistration>>,
}

impl RegistrationManager {
    /// Probes platform capabilities once and keeps the result.
    pub fn new(platform: Arc<dyn NotificationPlatform>) -> Self {
        let support = RuntimeSupport::probe(platform.as_ref());
        match support {
            RuntimeSupport::Supported(set) => info!(
                "event=capability_probe module=platform status=ok periodic_wake={}",
                set.periodic_wake
            ),
            RuntimeSupport::Unsupported(reason) => warn!(
                "event=capability_probe module=platform status=unsupported reason=\"{reason}\""
            ),
        }

        Self {
            platform,
            support,
            runtime: Mutex::new(None),
            periodic_wake: Mutex::new(None),
        }
    }

    pub fn support(&self) -> RuntimeSupport {
        self.support
    }

    pub fn platform(&self) -> &Arc<dyn NotificationPlatform> {
        &self.platform
    }

    /// Permission as the platform reports it. Support is a separate axis,
    /// see [`Self::support`].
    pub fn permission_state(&self) -> PermissionState {
        self.platform.permission_state()
    }

    /// Prompts only from `Default` on a supported platform; otherwise the
    /// current state is returned unchanged.
    pub fn request_permission(&self) -> PermissionState {
        let current = self.permission_state();
        if let RuntimeSupport::Unsupported(reason) = self.support {
            info!("event=permission_request module=platform status=skip reason=\"{reason}\"");
            return current;
        }
        if !current.can_prompt() {
            if current == PermissionState::Denied {
                info!("event=permission_request module=platform status=skip reason=denied");
            }
            return current;
        }

        let result = self.platform.request_permission();
        info!(
            "event=permission_request module=platform status=ok result={}",
            result.as_str()
        );
        result
    }

    /// Registers the background runtime once; later calls return the cached
    /// readiness latch.
    pub fn register_runtime(&self) -> RegistrationOutcome {
        if let RuntimeSupport::Unsupported(reason) = self.support {
            return RegistrationOutcome::Unsupported(reason);
        }

        let mut runtime = self
            .runtime
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(readiness) = runtime.as_ref() {
            return RegistrationOutcome::Registered(readiness.clone());
        }

        match self.platform.register_runtime() {
            Ok(()) => {
                info!("event=runtime_register module=platform status=ok");
                let readiness = RuntimeReadiness::new();
                *runtime = Some(readiness.clone());
                RegistrationOutcome::Registered(readiness)
            }
            Err(err) => {
                warn!("event=runtime_register module=platform status=error error={err}");
                RegistrationOutcome::Failed(err)
            }
        }
    }

    /// Readiness latch of an already registered runtime.
    pub fn runtime_readiness(&self) -> Option<RuntimeReadiness> {
        self.runtime
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Best-effort periodic wake subscription.
    ///
    /// Returns `false` (without error) when the platform lacks the
    /// capability or the permission is not granted.
    pub fn subscribe_periodic_wake(&self, registration: PeriodicWakeRegistration) -> bool {
        let Some(capabilities) = self.support.capabilities() else {
            return false;
        };
        if !capabilities.periodic_wake {
            info!(
                "event=periodic_wake_register module=platform status=skip reason=unsupported capability={}",
                PlatformCapability::PeriodicWake.as_str()
            );
            return false;
        }
        if !self.permission_state().is_granted() {
            info!("event=periodic_wake_register module=platform status=skip reason=permission");
            return false;
        }

        match self.platform.register_periodic_wake(&registration) {
            Ok(()) => {
                info!(
                    "event=periodic_wake_register module=platform status=ok tag={} min_interval_secs={}",
                    registration.tag,
                    registration.min_interval.as_secs()
                );
                *self
                    .periodic_wake
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(registration);
                true
            }
            Err(err) => {
                warn!("event=periodic_wake_register module=platform status=error error={err}");
                false
            }
        }
    }

    /// Drops the periodic wake subscription, leaving the runtime registered.
    pub fn unsubscribe_periodic_wake(&self) -> bool {
        let taken = self
            .periodic_wake
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        let Some(registration) = taken else {
            return false;
        };

        match self.platform.unregister_periodic_wake(&registration.tag) {
            Ok(()) => {
                info!(
                    "event=periodic_wake_unregister module=platform status=ok tag={}",
                    registration.tag
                );
                true
            }
            Err(err) => {
                warn!("event=periodic_wake_unregister module=platform status=error error={err}");
                false
            }
        }
    }

    pub fn periodic_wake(&self) -> Option<PeriodicWakeRegistration> {
        self.periodic_wake
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
