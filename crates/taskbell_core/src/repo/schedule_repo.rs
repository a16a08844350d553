//! Schedule repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide the record-set operations of the schedule collection:
//!   list, transactional replace, overdue range read, batch delete.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - `replace_all`, `replace_merged` and `delete_by_ids` are single
//!   transactions; they are the only atomic units shared between execution
//!   contexts.
//! - `get_overdue` is a range read on the `scheduled_time` index, never a
//!   full table scan.
//! - Read paths skip (and log) rows that fail to decode, so one bad row never
//!   blocks delivery of the others. `replace_merged` reads through the same
//!   path, which drops such rows from the table on the next recompute.

use crate::db::DbError;
use crate::model::notification::{NotificationPayload, NotificationType, ScheduledNotification};
use log::warn;
use rusqlite::{params, Connection, Row, Rows, Transaction, TransactionBehavior};
use thiserror::Error;

const SCHEDULE_SELECT_SQL: &str = "SELECT
    id,
    task_id,
    type,
    scheduled_time,
    payload
FROM scheduled_notifications";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for schedule and config persistence.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
    #[error("failed to encode record: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("storage is unavailable")]
    Unavailable,
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Record-set operations over the schedule collection.
pub trait ScheduleRepository {
    fn get_all(&self) -> RepoResult<Vec<ScheduledNotification>>;
    fn replace_all(&self, entries: &[ScheduledNotification]) -> RepoResult<()>;
    fn get_overdue(&self, now_ms: i64) -> RepoResult<Vec<ScheduledNotification>>;
    fn delete_by_ids(&self, ids: &[String]) -> RepoResult<usize>;

    /// Reads every entry, lets `merge` derive the desired set, and replaces
    /// the collection with it, all inside one write transaction.
    fn replace_merged<F>(&self, merge: F) -> RepoResult<Vec<ScheduledNotification>>
    where
        F: FnOnce(Vec<ScheduledNotification>) -> Vec<ScheduledNotification>;
}

/// SQLite-backed schedule repository.
pub struct SqliteScheduleRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteScheduleRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ScheduleRepository for SqliteScheduleRepository<'_> {
    fn get_all(&self) -> RepoResult<Vec<ScheduledNotification>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SCHEDULE_SELECT_SQL} ORDER BY scheduled_time ASC, id ASC;"
        ))?;
        let rows = stmt.query([])?;
        collect_valid_rows(rows)
    }

    /// Clears the collection and inserts `entries` in one transaction.
    ///
    /// Duplicate ids inside `entries` collapse to the last occurrence.
    fn replace_all(&self, entries: &[ScheduledNotification]) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        write_all(&tx, entries)?;
        tx.commit()?;
        Ok(())
    }

    fn get_overdue(&self, now_ms: i64) -> RepoResult<Vec<ScheduledNotification>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SCHEDULE_SELECT_SQL}
             WHERE scheduled_time <= ?1
             ORDER BY scheduled_time ASC, id ASC;"
        ))?;
        let rows = stmt.query([now_ms])?;
        collect_valid_rows(rows)
    }

    fn delete_by_ids(&self, ids: &[String]) -> RepoResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.unchecked_transaction()?;
        let mut removed = 0;
        {
            let mut delete = tx.prepare("DELETE FROM scheduled_notifications WHERE id = ?1;")?;
            for id in ids {
                removed += delete.execute([id.as_str()])?;
            }
        }
        tx.commit()?;
        Ok(removed)
    }

    fn replace_merged<F>(&self, merge: F) -> RepoResult<Vec<ScheduledNotification>>
    where
        F: FnOnce(Vec<ScheduledNotification>) -> Vec<ScheduledNotification>,
    {
        // IMMEDIATE takes the write lock before reading, so a delete committed
        // by the other context cannot land between our read and our write.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let existing = SqliteScheduleRepository::new(&tx).get_all()?;
        let merged = merge(existing);
        write_all(&tx, &merged)?;
        tx.commit()?;
        Ok(merged)
    }
}

fn write_all(tx: &Transaction<'_>, entries: &[ScheduledNotification]) -> RepoResult<()> {
    tx.execute("DELETE FROM scheduled_notifications;", [])?;
    let mut insert = tx.prepare(
        "INSERT OR REPLACE INTO scheduled_notifications (
            id,
            task_id,
            type,
            scheduled_time,
            payload
        ) VALUES (?1, ?2, ?3, ?4, ?5);",
    )?;
    for entry in entries {
        validate_entry(entry)?;
        let payload = serde_json::to_string(&entry.payload)?;
        insert.execute(params![
            entry.id.as_str(),
            entry.task_id.as_deref(),
            entry.kind.as_str(),
            entry.scheduled_time,
            payload,
        ])?;
    }
    Ok(())
}

fn validate_entry(entry: &ScheduledNotification) -> RepoResult<()> {
    if entry.id.trim().is_empty() {
        return Err(RepoError::InvalidData(
            "scheduled notification id must not be empty".to_string(),
        ));
    }
    if entry.kind.is_deadline() && entry.task_id.is_none() {
        return Err(RepoError::InvalidData(format!(
            "deadline notification `{}` has no task_id",
            entry.id
        )));
    }
    Ok(())
}

fn collect_valid_rows(mut rows: Rows<'_>) -> RepoResult<Vec<ScheduledNotification>> {
    let mut entries = Vec::new();
    while let Some(row) = rows.next()? {
        match parse_schedule_row(row) {
            Ok(entry) => entries.push(entry),
            Err(err) => {
                let id: Option<String> = row.get("id").ok();
                warn!(
                    "event=schedule_row_skip module=repo status=skip notification_id={} error={err}",
                    id.as_deref().unwrap_or("?")
                );
            }
        }
    }
    Ok(entries)
}

fn parse_schedule_row(row: &Row<'_>) -> RepoResult<ScheduledNotification> {
    let id: String = row.get("id")?;

    let type_text: String = row.get("type")?;
    let kind = NotificationType::parse(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid type `{type_text}` in scheduled_notifications.type"
        ))
    })?;

    let payload_text: String = row.get("payload")?;
    let payload: NotificationPayload = serde_json::from_str(&payload_text).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid payload for `{id}` in scheduled_notifications.payload: {err}"
        ))
    })?;

    let entry = ScheduledNotification {
        id,
        task_id: row.get("task_id")?,
        kind,
        scheduled_time: row.get("scheduled_time")?,
        payload,
    };
    validate_entry(&entry)?;
    Ok(entry)
}
