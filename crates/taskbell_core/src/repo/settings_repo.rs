//! Local config record for notification settings.
//!
//! # Responsibility
//! - Persist [`NotificationSettings`] as one JSON record under a fixed key in
//!   `local_config`, separate from the schedule collection.
//! - Fall back to defaults when nothing (or nothing readable) is stored.

use crate::db::{open_db, open_db_in_memory};
use crate::model::settings::NotificationSettings;
use crate::repo::schedule_repo::{RepoError, RepoResult};
use log::{error, warn};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// Local config key holding the notification settings record.
pub const NOTIFICATION_SETTINGS_KEY: &str = "notification-settings";

/// Key/value access to the local config table.
pub trait SettingsRepository {
    fn load(&self) -> RepoResult<Option<NotificationSettings>>;
    fn save(&self, settings: &NotificationSettings) -> RepoResult<()>;
}

pub struct SqliteSettingsRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSettingsRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SettingsRepository for SqliteSettingsRepository<'_> {
    fn load(&self) -> RepoResult<Option<NotificationSettings>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM local_config WHERE key = ?1;",
                [NOTIFICATION_SETTINGS_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(text) => serde_json::from_str(&text).map(Some).map_err(|err| {
                RepoError::InvalidData(format!(
                    "invalid `{NOTIFICATION_SETTINGS_KEY}` record in local_config: {err}"
                ))
            }),
            None => Ok(None),
        }
    }

    fn save(&self, settings: &NotificationSettings) -> RepoResult<()> {
        let value = serde_json::to_string(settings)?;
        self.conn.execute(
            "INSERT INTO local_config (key, value)
             VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![NOTIFICATION_SETTINGS_KEY, value],
        )?;
        Ok(())
    }
}

/// Owned settings store used by the notification service.
pub struct SettingsStore {
    conn: Option<Mutex<Connection>>,
}

impl SettingsStore {
    pub fn open(path: impl AsRef<Path>) -> Self {
        match open_db(path) {
            Ok(conn) => Self::from_connection(conn),
            Err(err) => {
                error!("event=settings_open module=settings status=error error={err}");
                Self { conn: None }
            }
        }
    }

    pub fn open_in_memory() -> Self {
        match open_db_in_memory() {
            Ok(conn) => Self::from_connection(conn),
            Err(err) => {
                error!("event=settings_open module=settings status=error error={err}");
                Self { conn: None }
            }
        }
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Some(Mutex::new(conn)),
        }
    }

    /// Loads stored settings, or defaults when absent or unreadable.
    pub fn load_or_default(&self) -> NotificationSettings {
        let Some(conn) = &self.conn else {
            return NotificationSettings::default();
        };
        let conn = conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match SqliteSettingsRepository::new(&conn).load() {
            Ok(Some(settings)) => settings,
            Ok(None) => NotificationSettings::default(),
            Err(err) => {
                warn!("event=settings_load module=settings status=error fallback=defaults error={err}");
                NotificationSettings::default()
            }
        }
    }

    /// Persists `settings`.
    ///
    /// Unlike the schedule store this reports failure, so the UI can tell the
    /// user a toggle did not stick.
    pub fn save(&self, settings: &NotificationSettings) -> RepoResult<()> {
        let Some(conn) = &self.conn else {
            return Err(RepoError::Unavailable);
        };
        let conn = conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        SqliteSettingsRepository::new(&conn).save(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::{SettingsRepository, SettingsStore, SqliteSettingsRepository};
    use crate::db::open_db_in_memory;
    use crate::model::settings::NotificationSettings;

    #[test]
    fn load_returns_none_when_unset() {
        let conn = open_db_in_memory().unwrap();
        assert_eq!(SqliteSettingsRepository::new(&conn).load().unwrap(), None);
    }

    #[test]
    fn save_overwrites_previous_record() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteSettingsRepository::new(&conn);

        let mut settings = NotificationSettings::default();
        repo.save(&settings).unwrap();
        settings.enabled = true;
        settings.daily_summary.time = "07:15".to_string();
        repo.save(&settings).unwrap();

        assert_eq!(repo.load().unwrap(), Some(settings));
    }

    #[test]
    fn corrupt_record_falls_back_to_defaults() {
        let conn = open_db_in_memory().unwrap();
        conn.execute(
            "INSERT INTO local_config (key, value) VALUES ('notification-settings', 'not json');",
            [],
        )
        .unwrap();

        let store = SettingsStore::from_connection(conn);
        assert_eq!(store.load_or_default(), NotificationSettings::default());
    }
}
