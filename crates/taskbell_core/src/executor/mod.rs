//! Delivery executor.
//!
//! # Responsibility
//! - Run the check-and-fire pass against the shared store.
//! - Drive it redundantly: foreground timer, background periodic wake, and
//!   cross-context bridge messages.
//!
//! # Invariants
//! - Per entry: `pending → displayed-and-removed | still-pending`. There is
//!   no cancelled state; a disabled feature simply stops running passes.
//! - Store writes are the batch delete of displayed ids and the re-arm of a
//!   displayed daily summary; task-driven compilation happens elsewhere.

pub mod background;
pub mod bridge;
pub mod check;
pub mod scheduler;

use crate::clock::Clock;
use crate::platform::NotificationPlatform;
use crate::repo::notification_store::NotificationStore;
use check::{check_and_execute, CheckReport};
use log::info;
use std::sync::Arc;
use std::time::Instant;

/// Execution context a pass runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionContext {
    Foreground,
    Background,
}

impl ExecutionContext {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Foreground => "foreground",
            Self::Background => "background",
        }
    }
}

/// What caused a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckTrigger {
    Timer,
    PeriodicWake,
    BridgeMessage,
    Manual,
}

impl CheckTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timer => "timer",
            Self::PeriodicWake => "periodic_wake",
            Self::BridgeMessage => "bridge_message",
            Self::Manual => "manual",
        }
    }
}

/// Store + display + clock bound to one execution context.
#[derive(Clone)]
pub struct DeliveryExecutor {
    store: Arc<NotificationStore>,
    platform: Arc<dyn NotificationPlatform>,
    clock: Arc<dyn Clock>,
    context: ExecutionContext,
}

impl DeliveryExecutor {
    pub fn new(
        store: Arc<NotificationStore>,
        platform: Arc<dyn NotificationPlatform>,
        clock: Arc<dyn Clock>,
        context: ExecutionContext,
    ) -> Self {
        Self {
            store,
            platform,
            clock,
            context,
        }
    }

    pub fn context(&self) -> ExecutionContext {
        self.context
    }

    /// Runs one check-and-execute pass at the clock's current time.
    pub fn run_check(&self, trigger: CheckTrigger) -> CheckReport {
        let started_at = Instant::now();
        let report = check_and_execute(
            self.store.as_ref(),
            self.platform.as_ref(),
            &self.clock.now(),
        );
        if report.checked > 0 {
            info!(
                "event=delivery_check module=executor status=ok context={} trigger={} checked={} displayed={} failed={} removed={} duration_ms={}",
                self.context.as_str(),
                trigger.as_str(),
                report.checked,
                report.displayed.len(),
                report.failed.len(),
                report.removed,
                started_at.elapsed().as_millis()
            );
        }
        report
    }
}
