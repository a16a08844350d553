//! Platform seam: notification display, permission, and background runtime.
//!
//! The host application implements [`NotificationPlatform`] over whatever the
//! device offers (desktop notification daemon, mobile OS, browser bridge).
//! Everything above this module branches on the one-shot
//! [`capability::RuntimeSupport`] probe instead of re-checking APIs.

use crate::model::notification::NotificationPayload;
use thiserror::Error;

pub mod capability;
pub mod permission;
pub mod registration;

use capability::PlatformCapability;
use permission::PermissionState;
use registration::PeriodicWakeRegistration;

/// Failure to put one notification on screen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisplayError {
    #[error("notification permission is not granted")]
    PermissionNotGranted,
    #[error("notification display rejected: {0}")]
    Rejected(String),
}

/// Failure of a registration call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("platform does not support {}", .0.as_str())]
    Unsupported(PlatformCapability),
    #[error("platform call failed: {0}")]
    Failed(String),
}

/// Host-provided primitives used by the engine.
///
/// Implementations must be callable from both execution contexts.
pub trait NotificationPlatform: Send + Sync {
    /// Reports whether a capability exists at all on this device.
    fn supports(&self, capability: PlatformCapability) -> bool;

    /// Current permission without prompting.
    fn permission_state(&self) -> PermissionState;

    /// Prompts the user. Only called from `Default` state.
    fn request_permission(&self) -> PermissionState;

    /// Displays one notification.
    fn show(&self, payload: &NotificationPayload) -> Result<(), DisplayError>;

    /// Registers the long-lived background runtime. Must be idempotent.
    fn register_runtime(&self) -> Result<(), PlatformError>;

    /// Subscribes a coarse periodic wake for the background runtime.
    fn register_periodic_wake(
        &self,
        registration: &PeriodicWakeRegistration,
    ) -> Result<(), PlatformError>;

    /// Drops the periodic wake subscription for `tag`.
    fn unregister_periodic_wake(&self, tag: &str) -> Result<(), PlatformError>;
}

/// Display-only view used by the delivery executor.
pub trait NotificationDisplay: Send + Sync {
    fn show(&self, payload: &NotificationPayload) -> Result<(), DisplayError>;
}

impl<P: NotificationPlatform + ?Sized> NotificationDisplay for P {
    fn show(&self, payload: &NotificationPayload) -> Result<(), DisplayError> {
        NotificationPlatform::show(self, payload)
    }
}
