//! Notification settings model.
//!
//! # Responsibility
//! - Define the user-facing notification settings and hard-coded defaults.
//! - Apply partial updates coming from the settings UI.
//!
//! # Invariants
//! - `daily_summary.time` is always a valid `HH:mm` 24-hour value once a
//!   patch has been applied through [`NotificationSettings::apply_patch`].
//! - Serialized field names are camelCase to match the stored config record.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static DAILY_TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01]\d|2[0-3]):([0-5]\d)$").expect("valid daily time regex"));

pub const DEFAULT_DAILY_SUMMARY_TIME: &str = "09:00";

/// Deadline reminder toggles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadlineReminderSettings {
    pub enabled: bool,
    pub one_day_before: bool,
    pub one_hour_before: bool,
}

impl Default for DeadlineReminderSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            one_day_before: true,
            one_hour_before: true,
        }
    }
}

/// Daily summary toggle and local fire time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummarySettings {
    pub enabled: bool,
    /// Local wall-clock time, `HH:mm`.
    pub time: String,
}

impl Default for DailySummarySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            time: DEFAULT_DAILY_SUMMARY_TIME.to_string(),
        }
    }
}

/// Settings read by the schedule compiler on every recompute.
///
/// `enabled` is the master switch: it gates the delivery executor, not the
/// stored schedule.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub enabled: bool,
    #[serde(default)]
    pub deadline_reminder: DeadlineReminderSettings,
    #[serde(default)]
    pub daily_summary: DailySummarySettings,
}

/// Partial deadline reminder update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadlineReminderPatch {
    pub enabled: Option<bool>,
    pub one_day_before: Option<bool>,
    pub one_hour_before: Option<bool>,
}

/// Partial daily summary update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummaryPatch {
    pub enabled: Option<bool>,
    pub time: Option<String>,
}

/// Partial settings update from the UI layer.
///
/// The master `enabled` switch is deliberately absent: it only changes
/// through enable/disable, which also drive permission and registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettingsPatch {
    pub deadline_reminder: Option<DeadlineReminderPatch>,
    pub daily_summary: Option<DailySummaryPatch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsValidationError {
    #[error("daily summary time must be HH:mm (24h), got `{0}`")]
    InvalidDailyTime(String),
}

impl NotificationSettings {
    /// Applies `patch` on a copy and returns it, leaving `self` untouched
    /// when validation fails.
    pub fn apply_patch(
        &self,
        patch: &NotificationSettingsPatch,
    ) -> Result<Self, SettingsValidationError> {
        let mut next = self.clone();

        if let Some(deadline) = &patch.deadline_reminder {
            if let Some(value) = deadline.enabled {
                next.deadline_reminder.enabled = value;
            }
            if let Some(value) = deadline.one_day_before {
                next.deadline_reminder.one_day_before = value;
            }
            if let Some(value) = deadline.one_hour_before {
                next.deadline_reminder.one_hour_before = value;
            }
        }

        if let Some(summary) = &patch.daily_summary {
            if let Some(value) = summary.enabled {
                next.daily_summary.enabled = value;
            }
            if let Some(time) = &summary.time {
                let trimmed = time.trim();
                if !is_valid_daily_time(trimmed) {
                    return Err(SettingsValidationError::InvalidDailyTime(time.clone()));
                }
                next.daily_summary.time = trimmed.to_string();
            }
        }

        Ok(next)
    }
}

/// Returns `(hour, minute)` for a valid `HH:mm` string.
pub fn parse_daily_time(value: &str) -> Option<(u32, u32)> {
    let captures = DAILY_TIME_RE.captures(value.trim())?;
    let hour = captures.get(1)?.as_str().parse().ok()?;
    let minute = captures.get(2)?.as_str().parse().ok()?;
    Some((hour, minute))
}

pub fn is_valid_daily_time(value: &str) -> bool {
    DAILY_TIME_RE.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::{
        parse_daily_time, DailySummaryPatch, DeadlineReminderPatch, NotificationSettings,
        NotificationSettingsPatch, SettingsValidationError,
    };

    #[test]
    fn defaults_match_product_defaults() {
        let settings = NotificationSettings::default();
        assert!(!settings.enabled);
        assert!(settings.deadline_reminder.enabled);
        assert!(settings.deadline_reminder.one_day_before);
        assert!(settings.deadline_reminder.one_hour_before);
        assert!(settings.daily_summary.enabled);
        assert_eq!(settings.daily_summary.time, "09:00");
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let json = serde_json::to_value(NotificationSettings::default()).unwrap();
        assert_eq!(json["deadlineReminder"]["oneDayBefore"], true);
        assert_eq!(json["dailySummary"]["time"], "09:00");
    }

    #[test]
    fn patch_updates_only_given_fields() {
        let patch = NotificationSettingsPatch {
            deadline_reminder: Some(DeadlineReminderPatch {
                one_hour_before: Some(false),
                ..DeadlineReminderPatch::default()
            }),
            daily_summary: Some(DailySummaryPatch {
                time: Some("18:30".to_string()),
                ..DailySummaryPatch::default()
            }),
        };

        let next = NotificationSettings::default().apply_patch(&patch).unwrap();
        assert!(next.deadline_reminder.one_day_before);
        assert!(!next.deadline_reminder.one_hour_before);
        assert_eq!(next.daily_summary.time, "18:30");
        assert!(next.daily_summary.enabled);
    }

    #[test]
    fn patch_rejects_invalid_time() {
        let patch = NotificationSettingsPatch {
            daily_summary: Some(DailySummaryPatch {
                time: Some("24:00".to_string()),
                ..DailySummaryPatch::default()
            }),
            ..NotificationSettingsPatch::default()
        };

        let err = NotificationSettings::default()
            .apply_patch(&patch)
            .unwrap_err();
        assert_eq!(
            err,
            SettingsValidationError::InvalidDailyTime("24:00".to_string())
        );
    }

    #[test]
    fn parses_daily_time() {
        assert_eq!(parse_daily_time("09:05"), Some((9, 5)));
        assert_eq!(parse_daily_time("23:59"), Some((23, 59)));
        assert_eq!(parse_daily_time("9:05"), None);
        assert_eq!(parse_daily_time("12:60"), None);
    }
}
