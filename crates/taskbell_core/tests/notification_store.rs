use rusqlite::Connection;
use taskbell_core::db::open_db_in_memory;
use taskbell_core::{NotificationStore, NotificationType, ScheduledNotification};

fn deadline(task_id: &str, kind: NotificationType, at: i64) -> ScheduledNotification {
    ScheduledNotification::deadline(task_id, "write report", kind, at)
}

#[test]
fn get_overdue_returns_exactly_due_entries() {
    let store = NotificationStore::open_in_memory();
    assert!(store.replace_all(&[
        deadline("a", NotificationType::Deadline1Day, 1_000),
        deadline("a", NotificationType::Deadline1Hour, 2_000),
        deadline("b", NotificationType::Deadline1Day, 2_001),
        ScheduledNotification::daily_summary(3, 500),
    ]));

    let ids: Vec<String> = store
        .get_overdue(2_000)
        .into_iter()
        .map(|entry| entry.id)
        .collect();
    assert_eq!(ids, vec!["daily-summary-500", "a-1day", "a-1hour"]);
    assert!(store.get_overdue(499).is_empty());
}

#[test]
fn replace_all_clears_previous_entries() {
    let store = NotificationStore::open_in_memory();
    store.replace_all(&[deadline("old", NotificationType::Deadline1Day, 10)]);
    store.replace_all(&[deadline("new", NotificationType::Deadline1Hour, 20)]);

    let all = store.get_all();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, "new-1hour");
    assert_eq!(all[0].task_id.as_deref(), Some("new"));
}

#[test]
fn delete_by_ids_ignores_missing_rows() {
    let store = NotificationStore::open_in_memory();
    store.replace_all(&[
        deadline("a", NotificationType::Deadline1Day, 10),
        deadline("b", NotificationType::Deadline1Day, 20),
    ]);

    let removed = store.delete_by_ids(&["a-1day".to_string(), "ghost-1day".to_string()]);
    assert_eq!(removed, 1);
    assert_eq!(store.delete_by_ids(&["a-1day".to_string()]), 0);
    assert_eq!(store.get_all().len(), 1);
}

#[test]
fn payload_survives_persistence() {
    let store = NotificationStore::open_in_memory();
    let entry = deadline("t-9", NotificationType::Deadline1Hour, 42);
    store.replace_all(std::slice::from_ref(&entry));

    let loaded = store.get_all().remove(0);
    assert_eq!(loaded, entry);
    assert_eq!(loaded.payload.tag, "deadline-t-9");
    assert_eq!(loaded.payload.data["taskId"], "t-9");
    assert_eq!(loaded.payload.data["url"], "/");
}

#[test]
fn two_handles_on_one_file_see_each_others_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.sqlite3");
    let foreground = NotificationStore::open(&path);
    let background = NotificationStore::open(&path);

    foreground.replace_all(&[deadline("a", NotificationType::Deadline1Day, 5)]);
    assert_eq!(background.get_overdue(5).len(), 1);

    assert_eq!(background.delete_by_ids(&["a-1day".to_string()]), 1);
    assert_eq!(foreground.delete_by_ids(&["a-1day".to_string()]), 0);
    assert!(foreground.get_all().is_empty());
}

#[test]
fn overdue_query_uses_time_index() {
    let conn = open_db_in_memory().unwrap();
    let plan = query_plan(
        &conn,
        "SELECT id FROM scheduled_notifications WHERE scheduled_time <= 100;",
    );
    assert!(
        plan.contains("idx_scheduled_notifications_scheduled_time"),
        "plan was: {plan}"
    );
}

#[test]
fn unopenable_path_gives_unavailable_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = NotificationStore::open(dir.path().join("missing").join("db.sqlite3"));

    assert!(!store.is_available());
    assert!(store.get_all().is_empty());
    assert!(!store.replace_all(&[deadline("a", NotificationType::Deadline1Day, 1)]));
}

fn query_plan(conn: &Connection, sql: &str) -> String {
    let mut stmt = conn.prepare(&format!("EXPLAIN QUERY PLAN {sql}")).unwrap();
    let details: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(3))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    details.join(" | ")
}

#[test]
fn malformed_row_does_not_block_valid_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mixed.sqlite3");
    let store = NotificationStore::open(&path);
    store.replace_all(&[deadline("a", NotificationType::Deadline1Day, 10)]);
    let raw = Connection::open(&path).unwrap();
    raw.execute(
        "INSERT INTO scheduled_notifications (id, task_id, type, scheduled_time, payload)
         VALUES ('bad', NULL, 'daily-summary', 1, '{}');",
        [],
    )
    .unwrap();
    drop(raw);

    let overdue: Vec<String> = store.get_overdue(10).into_iter().map(|e| e.id).collect();
    assert_eq!(overdue, vec!["a-1day"]);

    let merged = store.replace_merged(|existing| existing).unwrap();
    assert_eq!(merged.len(), 1);
    assert_eq!(store.get_all().len(), 1);
}
