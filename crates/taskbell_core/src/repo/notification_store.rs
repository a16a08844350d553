//! Fail-closed schedule store shared by the foreground and background contexts.
//!
//! # Responsibility
//! - Own one SQLite connection to the schedule collection.
//! - Expose the record-set contract without ever surfacing storage errors.
//!
//! # Invariants
//! - When the database cannot be opened (read-only media, quota, corrupt
//!   file), the store is *unavailable*: reads return empty, writes are no-ops.
//! - A failing operation on an available store is logged and degrades the
//!   same way for that call only.
//! - `delete_by_ids` is the only write issued by delivery. Combined with
//!   delete-after-display this gives at-least-once display and exactly-once
//!   persisted removal across contexts; no cross-context lock exists.

use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::model::notification::ScheduledNotification;
use crate::repo::schedule_repo::{RepoResult, ScheduleRepository, SqliteScheduleRepository};
use log::{debug, error, warn};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;

/// Shared handle to the durable schedule collection.
///
/// `Send + Sync`; each execution context may hold its own handle opened on
/// the same file, or share one behind an `Arc`.
pub struct NotificationStore {
    conn: Option<Mutex<Connection>>,
}

impl NotificationStore {
    /// Opens (or creates) the store at `path`.
    ///
    /// Never fails: an open error yields an unavailable store.
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self::from_open_result(open_db(path))
    }

    /// Opens a private in-memory store.
    pub fn open_in_memory() -> Self {
        Self::from_open_result(open_db_in_memory())
    }

    /// Wraps an already-migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Some(Mutex::new(conn)),
        }
    }

    /// Returns a store with notifications effectively disabled.
    pub fn unavailable() -> Self {
        Self { conn: None }
    }

    fn from_open_result(result: DbResult<Connection>) -> Self {
        match result {
            Ok(conn) => Self::from_connection(conn),
            Err(err) => {
                error!(
                    "event=store_open module=store status=error error_code=store_unavailable error={err}"
                );
                Self::unavailable()
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.conn.is_some()
    }

    /// Returns every scheduled entry ordered by fire time.
    pub fn get_all(&self) -> Vec<ScheduledNotification> {
        self.with_repo("get_all", Vec::new(), |repo| repo.get_all())
    }

    /// Clears the collection and inserts `entries` atomically.
    ///
    /// Returns `true` when the transaction committed.
    pub fn replace_all(&self, entries: &[ScheduledNotification]) -> bool {
        self.with_repo("replace_all", false, |repo| {
            repo.replace_all(entries).map(|()| true)
        })
    }

    /// Read-merge-write over the whole collection in one write transaction.
    ///
    /// Returns the committed set, or `None` when nothing was written.
    pub fn replace_merged<F>(&self, merge: F) -> Option<Vec<ScheduledNotification>>
    where
        F: FnOnce(Vec<ScheduledNotification>) -> Vec<ScheduledNotification>,
    {
        self.with_repo("replace_merged", None, |repo| {
            repo.replace_merged(merge).map(Some)
        })
    }

    /// Returns exactly the entries with `scheduled_time <= now_ms`.
    pub fn get_overdue(&self, now_ms: i64) -> Vec<ScheduledNotification> {
        self.with_repo("get_overdue", Vec::new(), |repo| repo.get_overdue(now_ms))
    }

    /// Removes `ids` in one transaction and returns how many rows went away.
    ///
    /// Ids already removed by another context are ignored, so a concurrent
    /// double delete is harmless.
    pub fn delete_by_ids(&self, ids: &[String]) -> usize {
        if ids.is_empty() {
            return 0;
        }
        self.with_repo("delete_by_ids", 0, |repo| repo.delete_by_ids(ids))
    }

    fn with_repo<T>(
        &self,
        operation: &'static str,
        fallback: T,
        run: impl FnOnce(&SqliteScheduleRepository<'_>) -> RepoResult<T>,
    ) -> T {
        let Some(conn) = &self.conn else {
            debug!("event=store_{operation} module=store status=skip reason=unavailable");
            return fallback;
        };

        let conn = conn.lock().unwrap_or_else(|poisoned| {
            warn!("event=store_lock module=store status=recovered reason=poisoned");
            poisoned.into_inner()
        });
        match run(&SqliteScheduleRepository::new(&conn)) {
            Ok(value) => value,
            Err(err) => {
                error!("event=store_{operation} module=store status=error error={err}");
                fallback
            }
        }
    }
}
