//! Ordered schema steps, tracked through `PRAGMA user_version`.
//!
//! Each step runs in its own transaction together with the version bump, so
//! an interrupted upgrade resumes at the first missing step.
//!
//! Step 1 is the schedule layout (`scheduled_notifications` plus its
//! `scheduled_time` index). Step 2 adds `local_config`, where the settings
//! record lives in the same file, so a current database reports
//! `user_version = 2`. A version 1 file upgrades in place without touching
//! schedule rows.

use crate::db::{DbError, DbResult};
use log::debug;
use rusqlite::Connection;

/// `(version, sql)`; versions strictly increase.
const STEPS: &[(u32, &str)] = &[
    (1, include_str!("0001_init.sql")),
    (2, include_str!("0002_local_config.sql")),
];

/// Latest schema version this build can write.
pub fn latest_version() -> u32 {
    STEPS.last().map_or(0, |(version, _)| *version)
}

/// Brings `conn` to [`latest_version`] and returns how many steps ran.
///
/// # Errors
/// - [`DbError::UnsupportedSchemaVersion`] when the file was written by a
///   newer build.
/// - SQLite errors from any step; earlier steps stay committed.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<usize> {
    let from = user_version(conn)?;
    let latest = latest_version();
    if from > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: latest,
        });
    }

    let mut applied = 0;
    for (version, sql) in STEPS.iter().filter(|(version, _)| *version > from) {
        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version)?;
        tx.commit()?;
        applied += 1;
        debug!("event=db_migrate_step module=db status=ok version={version}");
    }
    Ok(applied)
}

fn user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}
