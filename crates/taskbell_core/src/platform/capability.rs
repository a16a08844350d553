//! Platform capability declarations and the one-shot support probe.

use super::NotificationPlatform;
use std::fmt::{Display, Formatter};

/// Capability the engine may use on the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PlatformCapability {
    Notification,
    BackgroundRuntime,
    PeriodicWake,
}

impl PlatformCapability {
    /// Stable id used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Notification => "notification",
            Self::BackgroundRuntime => "background_runtime",
            Self::PeriodicWake => "periodic_wake",
        }
    }
}

/// Capabilities available once the required ones are confirmed present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilitySet {
    /// Optional: without it delivery relies on the foreground timer and
    /// bridge messages only.
    pub periodic_wake: bool,
}

/// Why the feature is unavailable on this device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedReason {
    NotificationApiMissing,
    BackgroundRuntimeMissing,
}

impl Display for UnsupportedReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotificationApiMissing => f.write_str("notifications are not supported"),
            Self::BackgroundRuntimeMissing => {
                f.write_str("background runtime is not supported")
            }
        }
    }
}

/// Result of the single capability probe performed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeSupport {
    Supported(CapabilitySet),
    Unsupported(UnsupportedReason),
}

impl RuntimeSupport {
    /// Probes `platform` once.
    pub fn probe(platform: &dyn NotificationPlatform) -> Self {
        if !platform.supports(PlatformCapability::Notification) {
            return Self::Unsupported(UnsupportedReason::NotificationApiMissing);
        }
        if !platform.supports(PlatformCapability::BackgroundRuntime) {
            return Self::Unsupported(UnsupportedReason::BackgroundRuntimeMissing);
        }
        Self::Supported(CapabilitySet {
            periodic_wake: platform.supports(PlatformCapability::PeriodicWake),
        })
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Supported(_))
    }

    pub fn capabilities(&self) -> Option<CapabilitySet> {
        match self {
            Self::Supported(set) => Some(*set),
            Self::Unsupported(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PlatformCapability, RuntimeSupport, UnsupportedReason};

    #[test]
    fn notification_api_is_checked_before_runtime() {
        let reason = RuntimeSupport::Unsupported(UnsupportedReason::NotificationApiMissing);
        assert!(!reason.is_supported());
        assert_eq!(reason.capabilities(), None);
        assert_eq!(
            UnsupportedReason::BackgroundRuntimeMissing.to_string(),
            "background runtime is not supported"
        );
    }

    #[test]
    fn log_ids_are_snake_case() {
        assert_eq!(PlatformCapability::BackgroundRuntime.as_str(), "background_runtime");
        assert_eq!(PlatformCapability::PeriodicWake.as_str(), "periodic_wake");
    }
}
