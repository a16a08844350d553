//! Notification permission state machine.
//!
//! `Default → Granted | Denied`. `Denied` is terminal for the profile: the
//! engine never prompts again and the UI must send the user to the system
//! or browser settings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    /// Never asked.
    Default,
    Granted,
    /// Terminal; only the user can revert it outside the app.
    Denied,
}

impl PermissionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Granted => "granted",
            Self::Denied => "denied",
        }
    }

    pub fn is_granted(self) -> bool {
        self == Self::Granted
    }

    /// Whether a prompt may still be shown.
    pub fn can_prompt(self) -> bool {
        self == Self::Default
    }

    /// Explanation shown in settings when prompting is impossible.
    pub fn guidance(self) -> Option<&'static str> {
        match self {
            Self::Denied => Some(
                "通知がブロックされています。ブラウザまたはシステムの設定から通知を許可してください。",
            ),
            Self::Default | Self::Granted => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PermissionState;

    #[test]
    fn only_default_can_prompt() {
        assert!(PermissionState::Default.can_prompt());
        assert!(!PermissionState::Granted.can_prompt());
        assert!(!PermissionState::Denied.can_prompt());
    }

    #[test]
    fn denied_has_guidance() {
        assert!(PermissionState::Denied.guidance().is_some());
        assert!(PermissionState::Granted.guidance().is_none());
    }
}
