//! Pure schedule compilation.
//!
//! # Responsibility
//! - Derive deadline reminders from open tasks with a due date.
//! - Derive the next daily summary occurrence.
//! - Merge one freshly compiled axis into an existing entry set.
//!
//! # Invariants
//! - Completed tasks, tasks without `due`, and offsets that have already
//!   passed produce no entry; this is how stale reminders are pruned.
//! - The daily summary always lands strictly after `now`.
//! - `merge_axis` never drops entries of the other axis.

use crate::clock::resolve_local;
use crate::model::notification::{daily_summary_id, NotificationType, ScheduledNotification};
use crate::model::settings::{parse_daily_time, NotificationSettings};
use crate::model::task::{parse_due, Task};
use chrono::{DateTime, Duration, NaiveDate, TimeZone};
use log::warn;

/// Independent recompute axes of the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleAxis {
    /// `deadline-1day` and `deadline-1hour` entries.
    Deadlines,
    /// The single `daily-summary` entry.
    DailySummary,
}

impl ScheduleAxis {
    pub fn contains(self, kind: NotificationType) -> bool {
        match self {
            Self::Deadlines => kind.is_deadline(),
            Self::DailySummary => kind == NotificationType::DailySummary,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deadlines => "deadlines",
            Self::DailySummary => "daily_summary",
        }
    }
}

/// Compiles deadline reminders for every open task with a due date.
///
/// An offset instant equal to `now` has not passed yet and is emitted; it
/// becomes overdue on the next delivery check.
pub fn compile_deadline_entries<Tz: TimeZone>(
    tasks: &[Task],
    settings: &NotificationSettings,
    now: &DateTime<Tz>,
) -> Vec<ScheduledNotification> {
    let reminder = &settings.deadline_reminder;
    if !reminder.enabled {
        return Vec::new();
    }

    let offsets = [
        (
            reminder.one_day_before,
            NotificationType::Deadline1Day,
            Duration::hours(24),
        ),
        (
            reminder.one_hour_before,
            NotificationType::Deadline1Hour,
            Duration::hours(1),
        ),
    ];

    let tz = now.timezone();
    let mut entries = Vec::new();
    for task in tasks.iter().filter(|task| !task.completed) {
        let Some(due_text) = task.due.as_deref() else {
            continue;
        };
        let Some(due) = parse_due(due_text, &tz) else {
            warn!(
                "event=schedule_compile module=schedule status=skip reason=invalid_due task_id={}",
                task.id
            );
            continue;
        };

        for (wanted, kind, offset) in offsets {
            if !wanted {
                continue;
            }
            let fire_at = due.clone() - offset;
            if fire_at < *now {
                continue;
            }
            entries.push(ScheduledNotification::deadline(
                &task.id,
                &task.title,
                kind,
                fire_at.timestamp_millis(),
            ));
        }
    }
    entries
}

/// Returns the next occurrence of the `HH:mm` wall-clock `time` after `now`.
///
/// Today's occurrence is used when it is still ahead; at or before `now` it
/// rolls forward exactly one calendar day. A wall-clock time skipped by a
/// DST gap moves one hour later; an ambiguous one takes the earlier instant.
pub fn next_daily_fire<Tz: TimeZone>(time: &str, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    let (hour, minute) = parse_daily_time(time)?;
    let tz = now.timezone();
    let today = now.date_naive();

    let today_at = local_instant(&tz, today, hour, minute)?;
    if today_at > *now {
        return Some(today_at);
    }
    local_instant(&tz, today.succ_opt()?, hour, minute)
}

/// Compiles the daily summary entry, or `None` when the summary is off.
///
/// The body reflects the incomplete-task count at compile time.
pub fn compile_daily_summary_entry<Tz: TimeZone>(
    tasks: &[Task],
    settings: &NotificationSettings,
    now: &DateTime<Tz>,
) -> Option<ScheduledNotification> {
    let summary = &settings.daily_summary;
    if !summary.enabled {
        return None;
    }

    let Some(fire_at) = next_daily_fire(&summary.time, now) else {
        warn!(
            "event=schedule_compile module=schedule status=skip reason=invalid_daily_time axis=daily_summary"
        );
        return None;
    };

    let incomplete = tasks.iter().filter(|task| !task.completed).count();
    Some(ScheduledNotification::daily_summary(
        incomplete,
        fire_at.timestamp_millis(),
    ))
}

/// Next occurrence of a summary that has just fired.
///
/// Keeps the fired entry's local wall-clock time and payload; the body count
/// is refreshed by the next task-driven recompute.
pub fn rearm_daily_summary<Tz: TimeZone>(
    fired: &ScheduledNotification,
    now: &DateTime<Tz>,
) -> Option<ScheduledNotification> {
    if fired.kind != NotificationType::DailySummary {
        return None;
    }
    let fired_at = now
        .timezone()
        .timestamp_millis_opt(fired.scheduled_time)
        .single()?;
    let time = fired_at.naive_local().format("%H:%M").to_string();
    let next_ms = next_daily_fire(&time, now)?.timestamp_millis();

    Some(ScheduledNotification {
        id: daily_summary_id(next_ms),
        scheduled_time: next_ms,
        ..fired.clone()
    })
}

/// Drops `existing` entries that belong to `axis`, then appends `fresh`.
pub fn merge_axis(
    existing: Vec<ScheduledNotification>,
    axis: ScheduleAxis,
    fresh: Vec<ScheduledNotification>,
) -> Vec<ScheduledNotification> {
    existing
        .into_iter()
        .filter(|entry| !axis.contains(entry.kind))
        .chain(fresh)
        .collect()
}

fn local_instant<Tz: TimeZone>(
    tz: &Tz,
    date: NaiveDate,
    hour: u32,
    minute: u32,
) -> Option<DateTime<Tz>> {
    resolve_local(tz, &date.and_hms_opt(hour, minute, 0)?)
}
