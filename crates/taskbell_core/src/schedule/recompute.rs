//! Event-driven schedule recompute against the persistent store.
//!
//! # Responsibility
//! - Compile one axis (or both) for the current task list and settings.
//! - Merge the result into the store with filter-then-append semantics.
//!
//! # Invariants
//! - Each axis write is one read-merge-write transaction; entries are never
//!   mutated in place, only deleted and reinserted.
//! - After any recompute the store holds at most one daily-summary entry.

use crate::clock::Clock;
use crate::model::notification::ScheduledNotification;
use crate::model::settings::NotificationSettings;
use crate::model::task::Task;
use crate::repo::notification_store::NotificationStore;
use crate::schedule::compiler::{
    compile_daily_summary_entry, compile_deadline_entries, merge_axis, ScheduleAxis,
};
use log::{error, info};
use std::sync::Arc;
use std::time::Instant;

/// Recompute service that owns the compile-and-merge step.
pub struct ScheduleCompiler {
    store: Arc<NotificationStore>,
    clock: Arc<dyn Clock>,
}

impl ScheduleCompiler {
    pub fn new(store: Arc<NotificationStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Recompiles deadline reminders; the daily summary is left untouched.
    ///
    /// Returns the deadline entries now scheduled (empty when the store is
    /// unavailable or the write failed).
    pub fn recompute_deadlines(
        &self,
        tasks: &[Task],
        settings: &NotificationSettings,
    ) -> Vec<ScheduledNotification> {
        let fresh = compile_deadline_entries(tasks, settings, &self.clock.now());
        self.write_axis(ScheduleAxis::Deadlines, fresh)
    }

    /// Recompiles the daily summary; deadline reminders are left untouched.
    pub fn recompute_daily_summary(
        &self,
        tasks: &[Task],
        settings: &NotificationSettings,
    ) -> Vec<ScheduledNotification> {
        let fresh = compile_daily_summary_entry(tasks, settings, &self.clock.now())
            .into_iter()
            .collect();
        self.write_axis(ScheduleAxis::DailySummary, fresh)
    }

    /// Recompiles both axes.
    pub fn recompute_all(
        &self,
        tasks: &[Task],
        settings: &NotificationSettings,
    ) -> Vec<ScheduledNotification> {
        let mut scheduled = self.recompute_deadlines(tasks, settings);
        scheduled.extend(self.recompute_daily_summary(tasks, settings));
        scheduled
    }

    fn write_axis(
        &self,
        axis: ScheduleAxis,
        fresh: Vec<ScheduledNotification>,
    ) -> Vec<ScheduledNotification> {
        let started_at = Instant::now();
        let written = self
            .store
            .replace_merged(|existing| merge_axis(existing, axis, fresh));

        match written {
            Some(entries) => {
                let axis_entries: Vec<ScheduledNotification> = entries
                    .iter()
                    .filter(|entry| axis.contains(entry.kind))
                    .cloned()
                    .collect();
                info!(
                    "event=schedule_recompute module=schedule status=ok axis={} axis_entries={} total_entries={} duration_ms={}",
                    axis.as_str(),
                    axis_entries.len(),
                    entries.len(),
                    started_at.elapsed().as_millis()
                );
                axis_entries
            }
            None => {
                error!(
                    "event=schedule_recompute module=schedule status=error axis={} duration_ms={}",
                    axis.as_str(),
                    started_at.elapsed().as_millis()
                );
                Vec::new()
            }
        }
    }
}
