//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define data access contracts for the schedule collection and the
//!   local settings record.
//! - Isolate SQLite query details from compiler/executor orchestration.
//!
//! # Invariants
//! - Typed repositories return semantic errors (`InvalidData`) in addition to
//!   DB transport errors.
//! - The [`notification_store::NotificationStore`] facade never surfaces
//!   errors: storage trouble degrades to empty reads and no-op writes.

pub mod notification_store;
pub mod schedule_repo;
pub mod settings_repo;
