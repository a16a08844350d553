//! Schedule compilation.
//!
//! # Responsibility
//! - Turn the task list and settings into the desired schedule entries.
//! - Merge one recomputed axis into the store without evicting the other.
//!
//! # Invariants
//! - Compilation is pure: time comes in as an argument.
//! - Recompute is event driven (task or settings change), never on a timer.

pub mod compiler;
pub mod recompute;
