//! Use-case services.
//!
//! # Responsibility
//! - Orchestrate platform, schedule, and delivery layers into UI-level APIs.
//! - Keep UI layers decoupled from storage and threading details.

pub mod notification_service;
