mod common;

use common::{local, FakePlatform};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use taskbell_core::{
    check_and_execute, BackgroundToForeground, BackgroundWorker, CheckTrigger, DeliveryExecutor,
    ExecutionContext, FixedClock, ForegroundScheduler, ForegroundToBackground, MessageBridge,
    NotificationSettings, NotificationStore, NotificationType, PermissionState, RuntimeReadiness,
    ScheduleCompiler, ScheduledNotification, Task, WakeOutcome,
};

fn granted_platform() -> Arc<FakePlatform> {
    Arc::new(FakePlatform::full().with_permission(PermissionState::Granted))
}

fn seeded_store(now_ms: i64) -> Arc<NotificationStore> {
    let store = Arc::new(NotificationStore::open_in_memory());
    assert!(store.replace_all(&[
        ScheduledNotification::deadline("a", "a", NotificationType::Deadline1Day, now_ms - 60_000),
        ScheduledNotification::deadline("b", "b", NotificationType::Deadline1Hour, now_ms),
        ScheduledNotification::deadline("c", "c", NotificationType::Deadline1Day, now_ms + 1),
    ]));
    store
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

#[test]
fn displayed_entries_are_removed_and_future_ones_kept() {
    let now = local(2025, 1, 15, 10, 0);
    let store = seeded_store(now.timestamp_millis());
    let platform = granted_platform();

    let report = check_and_execute(store.as_ref(), platform.as_ref(), &now);

    assert_eq!(report.checked, 2);
    assert_eq!(report.displayed, vec!["a-1day", "b-1hour"]);
    assert!(report.failed.is_empty());
    assert_eq!(report.removed, 2);
    let remaining: Vec<String> = store.get_all().into_iter().map(|e| e.id).collect();
    assert_eq!(remaining, vec!["c-1day"]);
}

#[test]
fn failed_display_stays_pending_for_next_pass() {
    let now = local(2025, 1, 15, 10, 0);
    let store = seeded_store(now.timestamp_millis());
    let platform = granted_platform();
    platform.fail_tag("deadline-b");

    let report = check_and_execute(store.as_ref(), platform.as_ref(), &now);
    assert_eq!(report.displayed, vec!["a-1day"]);
    assert_eq!(report.failed, vec!["b-1hour"]);
    assert_eq!(store.get_overdue(now.timestamp_millis()).len(), 1);

    let platform = granted_platform();
    let retry = check_and_execute(store.as_ref(), platform.as_ref(), &now);
    assert_eq!(retry.displayed, vec!["b-1hour"]);
}

#[test]
fn very_late_entries_are_still_delivered() {
    let now = local(2025, 3, 1, 12, 0);
    let store = Arc::new(NotificationStore::open_in_memory());
    let stale = local(2025, 1, 1, 9, 0).timestamp_millis();
    store.replace_all(&[ScheduledNotification::daily_summary(4, stale)]);
    let platform = granted_platform();

    let report = check_and_execute(store.as_ref(), platform.as_ref(), &now);

    assert_eq!(report.removed, 1);
    assert_eq!(platform.shown()[0].body, "未完了タスク: 4件");
    let next = local(2025, 3, 2, 9, 0).timestamp_millis();
    assert_eq!(report.rearmed, Some(format!("daily-summary-{next}")));
}

#[test]
fn two_contexts_remove_each_entry_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("race.sqlite3");
    let now = local(2025, 1, 15, 10, 0);
    let foreground = NotificationStore::open(&path);
    let background = NotificationStore::open(&path);
    foreground.replace_all(&[ScheduledNotification::deadline(
        "a",
        "a",
        NotificationType::Deadline1Day,
        now.timestamp_millis(),
    )]);
    let platform = granted_platform();

    let first = check_and_execute(&foreground, platform.as_ref(), &now);
    let second = check_and_execute(&background, platform.as_ref(), &now);

    assert_eq!(first.removed + second.removed, 1);
    assert!(foreground.get_all().is_empty());
}

#[test]
fn scheduler_runs_immediately_and_stops_cleanly() {
    let now = local(2025, 1, 15, 10, 0);
    let store = seeded_store(now.timestamp_millis());
    let platform = granted_platform();
    let clock = Arc::new(FixedClock::new(now));
    let executor = DeliveryExecutor::new(
        Arc::clone(&store),
        platform.clone(),
        clock,
        ExecutionContext::Foreground,
    );
    let scheduler =
        ForegroundScheduler::new(executor, Arc::new(MessageBridge::new()), Duration::from_secs(3600));

    assert!(scheduler.start());
    assert!(scheduler.start());
    assert!(wait_until(Duration::from_secs(5), || platform.shown().len() == 2));

    scheduler.stop();
    assert!(!scheduler.is_running());
    assert!(scheduler.start());

    scheduler.dispose();
    assert!(!scheduler.start());
    assert_eq!(store.get_all().len(), 1);
}

#[test]
fn scheduler_answers_background_check_requests() {
    let now = local(2025, 1, 15, 10, 0);
    let store = Arc::new(NotificationStore::open_in_memory());
    let platform = granted_platform();
    let clock = Arc::new(FixedClock::new(now));
    let bridge = Arc::new(MessageBridge::new());
    let executor = DeliveryExecutor::new(
        Arc::clone(&store),
        platform.clone(),
        clock,
        ExecutionContext::Foreground,
    );
    let scheduler = ForegroundScheduler::new(executor, Arc::clone(&bridge), Duration::from_secs(3600));
    assert!(scheduler.start());
    assert!(wait_until(Duration::from_secs(5), || bridge.client_count() == 1));

    store.replace_all(&[ScheduledNotification::daily_summary(2, now.timestamp_millis())]);
    assert_eq!(bridge.post_to_clients(BackgroundToForeground::RequestCheck), 1);

    assert!(wait_until(Duration::from_secs(5), || {
        store.get_overdue(now.timestamp_millis()).is_empty()
    }));
    assert_eq!(platform.shown_tags(), vec!["daily-summary"]);
}

#[test]
fn periodic_wake_delegates_to_open_pages() {
    let now = local(2025, 1, 15, 10, 0);
    let store = seeded_store(now.timestamp_millis());
    let platform = granted_platform();
    let bridge = Arc::new(MessageBridge::new());
    let executor = DeliveryExecutor::new(
        Arc::clone(&store),
        platform.clone(),
        Arc::new(FixedClock::new(now)),
        ExecutionContext::Background,
    );
    let worker = BackgroundWorker::new(executor, Arc::clone(&bridge), "check-notifications");

    let page = bridge.attach_client();
    assert_eq!(
        worker.on_periodic_wake("check-notifications"),
        WakeOutcome::Delegated { pages: 1 }
    );
    assert_eq!(page.try_recv().unwrap(), BackgroundToForeground::RequestCheck);
    assert!(platform.shown().is_empty());

    drop(page);
    match worker.on_periodic_wake("check-notifications") {
        WakeOutcome::CheckedLocally(report) => assert_eq!(report.removed, 2),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(worker.on_periodic_wake("other-tag"), WakeOutcome::IgnoredTag);
}

#[test]
fn activated_worker_runs_checks_posted_by_foreground() {
    let now = local(2025, 1, 15, 10, 0);
    let store = seeded_store(now.timestamp_millis());
    let platform = granted_platform();
    let bridge = Arc::new(MessageBridge::new());
    let executor = DeliveryExecutor::new(
        Arc::clone(&store),
        platform.clone(),
        Arc::new(FixedClock::new(now)),
        ExecutionContext::Background,
    );
    let worker = BackgroundWorker::new(executor, Arc::clone(&bridge), "check-notifications");
    let readiness = RuntimeReadiness::new();

    assert!(worker.activate(&readiness));
    assert!(readiness.is_ready());
    assert!(bridge.post_to_background(ForegroundToBackground::RunCheck));
    assert!(wait_until(Duration::from_secs(5), || platform.shown().len() == 2));

    worker.shutdown();
    assert!(!bridge.post_to_background(ForegroundToBackground::RunCheck));
    let report = worker.handle_message(ForegroundToBackground::RunCheck);
    assert_eq!(report.checked, 0);
}

#[test]
fn daily_summary_fires_again_the_next_day() {
    let store = Arc::new(NotificationStore::open_in_memory());
    let platform = granted_platform();
    let clock = Arc::new(FixedClock::new(local(2025, 1, 15, 8, 0)));
    let compiler = ScheduleCompiler::new(Arc::clone(&store), clock.clone());
    let settings = NotificationSettings {
        enabled: true,
        ..NotificationSettings::default()
    };
    assert_eq!(
        compiler
            .recompute_daily_summary(&[Task::new("t1", "open")], &settings)
            .len(),
        1
    );
    let executor = DeliveryExecutor::new(
        Arc::clone(&store),
        platform.clone(),
        clock.clone(),
        ExecutionContext::Background,
    );

    clock.set(local(2025, 1, 15, 9, 1));
    let day_one = executor.run_check(CheckTrigger::PeriodicWake);
    let first_fire = local(2025, 1, 15, 9, 0).timestamp_millis();
    assert_eq!(day_one.displayed, vec![format!("daily-summary-{first_fire}")]);
    let second_fire = local(2025, 1, 16, 9, 0).timestamp_millis();
    assert_eq!(day_one.rearmed, Some(format!("daily-summary-{second_fire}")));

    clock.set(local(2025, 1, 16, 10, 0));
    let day_two = executor.run_check(CheckTrigger::PeriodicWake);
    assert_eq!(day_two.displayed, vec![format!("daily-summary-{second_fire}")]);

    let summaries: Vec<_> = store
        .get_all()
        .into_iter()
        .filter(|entry| entry.kind == NotificationType::DailySummary)
        .collect();
    assert_eq!(summaries.len(), 1);
    assert_eq!(
        summaries[0].scheduled_time,
        local(2025, 1, 17, 9, 0).timestamp_millis()
    );
    assert_eq!(platform.shown().len(), 2);
    assert!(platform.shown().iter().all(|p| p.body == "未完了タスク: 1件"));
}

#[test]
fn rearm_keeps_a_summary_already_recompiled() {
    let now = local(2025, 1, 15, 9, 1);
    let store = Arc::new(NotificationStore::open_in_memory());
    let tomorrow_noon = local(2025, 1, 16, 12, 0).timestamp_millis();
    assert!(store.replace_all(&[
        ScheduledNotification::daily_summary(1, local(2025, 1, 15, 9, 0).timestamp_millis()),
        ScheduledNotification::daily_summary(3, tomorrow_noon),
    ]));
    let platform = granted_platform();

    let report = check_and_execute(store.as_ref(), platform.as_ref(), &now);

    assert_eq!(report.removed, 1);
    assert_eq!(report.rearmed, None);
    let remaining: Vec<i64> = store.get_all().into_iter().map(|e| e.scheduled_time).collect();
    assert_eq!(remaining, vec![tomorrow_noon]);
}
