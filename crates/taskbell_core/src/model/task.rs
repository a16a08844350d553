//! Read-only task projection consumed from the board subsystem.
//!
//! The board owns and mutates tasks; this crate only reads the fields that
//! drive reminders.

use crate::clock::resolve_local;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

const NAIVE_DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    /// ISO-8601 due instant; `None` when the task has no deadline.
    #[serde(default)]
    pub due: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            due: None,
            completed: false,
        }
    }

    pub fn with_due(mut self, due: impl Into<String>) -> Self {
        self.due = Some(due.into());
        self
    }

    pub fn completed(mut self) -> Self {
        self.completed = true;
        self
    }
}

/// Parses an ISO-8601 due value in `tz`.
///
/// Values carrying an offset are converted; offset-less values are local
/// wall-clock times in `tz` (a bare date is local midnight), resolved like
/// every other wall-clock time (see [`resolve_local`]). Returns `None` for
/// anything unparseable.
pub fn parse_due<Tz: TimeZone>(value: &str, tz: &Tz) -> Option<DateTime<Tz>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(with_offset) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(with_offset.with_timezone(tz));
    }

    let naive = NAIVE_DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;

    resolve_local(tz, &naive)
}
