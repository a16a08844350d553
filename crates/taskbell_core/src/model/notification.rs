//! Scheduled notification record.
//!
//! # Responsibility
//! - Define the record persisted in the schedule store.
//! - Derive deterministic ids and user-facing payload text.
//!
//! # Invariants
//! - `id` is a pure function of `(task_id, kind)` for deadline reminders and
//!   of `scheduled_time` for the daily summary, so recompiling supersedes the
//!   previous record instead of duplicating it.
//! - Deadline kinds always carry `task_id`; the daily summary never does.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::{Display, Formatter};

/// Notification tag shared by every daily summary.
pub const DAILY_SUMMARY_TAG: &str = "daily-summary";
/// Click target carried in payload data.
pub const DEFAULT_CLICK_URL: &str = "/";

/// Kind of scheduled reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationType {
    /// Fires 24 hours before a task is due.
    #[serde(rename = "deadline-1day")]
    Deadline1Day,
    /// Fires one hour before a task is due.
    #[serde(rename = "deadline-1hour")]
    Deadline1Hour,
    /// Recurring digest of incomplete tasks.
    #[serde(rename = "daily-summary")]
    DailySummary,
}

impl NotificationType {
    /// Stable string id used for persistence and payload data.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deadline1Day => "deadline-1day",
            Self::Deadline1Hour => "deadline-1hour",
            Self::DailySummary => "daily-summary",
        }
    }

    /// Parses a persisted type value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "deadline-1day" => Some(Self::Deadline1Day),
            "deadline-1hour" => Some(Self::Deadline1Hour),
            "daily-summary" => Some(Self::DailySummary),
            _ => None,
        }
    }

    pub fn is_deadline(self) -> bool {
        matches!(self, Self::Deadline1Day | Self::Deadline1Hour)
    }
}

impl Display for NotificationType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content handed to the platform display API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    /// Platform replacement tag; a newer notification with the same tag
    /// replaces the visible one.
    pub tag: String,
    /// Opaque data forwarded to click handlers.
    #[serde(default)]
    pub data: Value,
}

/// Durable schedule record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledNotification {
    pub id: String,
    pub task_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    /// Unix epoch milliseconds.
    pub scheduled_time: i64,
    pub payload: NotificationPayload,
}

impl ScheduledNotification {
    /// Builds a deadline reminder for one task.
    ///
    /// `kind` must be a deadline kind; passing `DailySummary` falls back to
    /// the one-day wording and is never done by the compiler.
    pub fn deadline(
        task_id: &str,
        task_title: &str,
        kind: NotificationType,
        scheduled_time: i64,
    ) -> Self {
        let (title, body) = match kind {
            NotificationType::Deadline1Hour => (
                "まもなく期限です",
                format!("「{task_title}」の期限まであと1時間です"),
            ),
            NotificationType::Deadline1Day | NotificationType::DailySummary => (
                "期限が近づいています",
                format!("「{task_title}」の期限まであと1日です"),
            ),
        };

        Self {
            id: deadline_id(task_id, kind),
            task_id: Some(task_id.to_string()),
            kind,
            scheduled_time,
            payload: NotificationPayload {
                title: title.to_string(),
                body,
                tag: format!("deadline-{task_id}"),
                data: payload_data(kind.as_str(), Some(task_id)),
            },
        }
    }

    /// Builds the daily summary record firing at `scheduled_time`.
    pub fn daily_summary(incomplete_count: usize, scheduled_time: i64) -> Self {
        Self {
            id: daily_summary_id(scheduled_time),
            task_id: None,
            kind: NotificationType::DailySummary,
            scheduled_time,
            payload: NotificationPayload {
                title: "今日のタスク".to_string(),
                body: daily_summary_body(incomplete_count),
                tag: DAILY_SUMMARY_TAG.to_string(),
                data: payload_data(NotificationType::DailySummary.as_str(), None),
            },
        }
    }
}

/// Builds the payload used by the direct test notification.
pub fn test_payload() -> NotificationPayload {
    NotificationPayload {
        title: "テスト通知".to_string(),
        body: "通知は正しく設定されています".to_string(),
        tag: "test".to_string(),
        data: payload_data("test", None),
    }
}

/// Returns `{task_id}-1day` or `{task_id}-1hour`.
pub fn deadline_id(task_id: &str, kind: NotificationType) -> String {
    let suffix = match kind {
        NotificationType::Deadline1Hour => "1hour",
        NotificationType::Deadline1Day | NotificationType::DailySummary => "1day",
    };
    format!("{task_id}-{suffix}")
}

/// Returns `daily-summary-{scheduled_time}`.
pub fn daily_summary_id(scheduled_time: i64) -> String {
    format!("{DAILY_SUMMARY_TAG}-{scheduled_time}")
}

/// Returns the summary body for `incomplete_count` open tasks.
pub fn daily_summary_body(incomplete_count: usize) -> String {
    format!("未完了タスク: {incomplete_count}件")
}

fn payload_data(kind: &str, task_id: Option<&str>) -> Value {
    json!({
        "type": kind,
        "taskId": task_id,
        "url": DEFAULT_CLICK_URL,
    })
}
