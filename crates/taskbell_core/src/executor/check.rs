//! Check-and-execute pass.
//!
//! Identical logic runs in whichever context triggers it:
//! read overdue, display each, batch-delete the ones that displayed, then
//! re-arm a displayed daily summary for its next occurrence.
//!
//! Delivery contract across contexts: no lock spans the read-display-delete
//! sequence, so two contexts reading the same overdue entry may both display
//! it (at-least-once display). Deletion is one transaction and ignores ids
//! already gone, so an entry is removed exactly once and never reappears.
//! A failed display leaves the entry pending for the next pass. Entries are
//! never expired for lateness.

use crate::model::notification::{NotificationType, ScheduledNotification};
use crate::platform::NotificationDisplay;
use crate::repo::notification_store::NotificationStore;
use crate::schedule::compiler::{merge_axis, rearm_daily_summary, ScheduleAxis};
use chrono::{DateTime, TimeZone};
use log::{info, warn};

/// Outcome of one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    /// Overdue entries found.
    pub checked: usize,
    /// Ids displayed successfully (and submitted for deletion).
    pub displayed: Vec<String>,
    /// Ids whose display failed; they stay pending.
    pub failed: Vec<String>,
    /// Rows actually removed; lower than `displayed` when the other context
    /// deleted some first.
    pub removed: usize,
    /// Id of the next daily summary armed by this pass.
    pub rearmed: Option<String>,
}

/// Runs one pass at `now`.
pub fn check_and_execute<D, Tz>(
    store: &NotificationStore,
    display: &D,
    now: &DateTime<Tz>,
) -> CheckReport
where
    D: NotificationDisplay + ?Sized,
    Tz: TimeZone,
{
    let now_ms = now.timestamp_millis();
    let overdue = store.get_overdue(now_ms);
    let mut report = CheckReport {
        checked: overdue.len(),
        ..CheckReport::default()
    };

    let mut fired_summary = None;
    for entry in overdue {
        match display.show(&entry.payload) {
            Ok(()) => {
                report.displayed.push(entry.id.clone());
                if entry.kind == NotificationType::DailySummary {
                    fired_summary = Some(entry);
                }
            }
            Err(err) => {
                warn!(
                    "event=delivery_display module=executor status=error notification_id={} type={} error={}",
                    entry.id, entry.kind, err
                );
                report.failed.push(entry.id);
            }
        }
    }

    report.removed = store.delete_by_ids(&report.displayed);
    if let Some(fired) = fired_summary {
        report.rearmed = rearm(store, &fired, now);
    }
    report
}

/// Arms the summary after `fired` unless a future one is already stored.
fn rearm<Tz: TimeZone>(
    store: &NotificationStore,
    fired: &ScheduledNotification,
    now: &DateTime<Tz>,
) -> Option<String> {
    let next = rearm_daily_summary(fired, now)?;
    let now_ms = now.timestamp_millis();
    let next_id = next.id.clone();

    let written = store.replace_merged(|existing| {
        let armed = existing.iter().any(|entry| {
            entry.kind == NotificationType::DailySummary && entry.scheduled_time > now_ms
        });
        if armed {
            existing
        } else {
            merge_axis(existing, ScheduleAxis::DailySummary, vec![next])
        }
    })?;

    let armed = written.iter().find(|entry| entry.kind == NotificationType::DailySummary)?;
    info!(
        "event=summary_rearm module=executor status=ok notification_id={} scheduled_time={}",
        armed.id, armed.scheduled_time
    );
    (armed.id == next_id).then_some(next_id)
}
