//! Domain model for reminder scheduling.
//!
//! # Responsibility
//! - Define the persisted schedule record and its payload.
//! - Define user-facing notification settings and their defaults.
//! - Mirror the read-only task shape consumed from the board subsystem.
//!
//! # Invariants
//! - Schedule ids are derived from task/type (or fire time), never random.

pub mod notification;
pub mod settings;
pub mod task;
