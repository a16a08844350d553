//! Background context worker.
//!
//! # Responsibility
//! - React to the platform's periodic wake: ask reachable pages to check,
//!   or run its own pass against its own store handle when none is open.
//! - Run a pass whenever the foreground posts `RunCheck`.
//! - Signal runtime readiness to the foreground.
//!
//! # Invariants
//! - The worker never compiles schedules from tasks; its store writes are
//!   the delivery batch delete and the daily summary re-arm.

use super::bridge::{BackgroundToForeground, ForegroundToBackground, MessageBridge};
use super::check::CheckReport;
use super::{CheckTrigger, DeliveryExecutor};
use crate::platform::registration::RuntimeReadiness;
use crossbeam_channel::{bounded, select, Sender};
use log::{debug, error, info};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// What the worker did for one periodic wake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WakeOutcome {
    /// Pages were reachable and asked to check.
    Delegated { pages: usize },
    /// No page reachable; the worker checked itself.
    CheckedLocally(CheckReport),
    /// The wake carried a tag this worker does not own.
    IgnoredTag,
}

struct ListenerThread {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

pub struct BackgroundWorker {
    executor: DeliveryExecutor,
    bridge: Arc<MessageBridge>,
    wake_tag: String,
    listener: Mutex<Option<ListenerThread>>,
}

impl BackgroundWorker {
    pub fn new(
        executor: DeliveryExecutor,
        bridge: Arc<MessageBridge>,
        wake_tag: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            bridge,
            wake_tag: wake_tag.into(),
            listener: Mutex::new(None),
        }
    }

    /// Starts listening for foreground messages and marks the runtime ready.
    pub fn activate(&self, readiness: &RuntimeReadiness) -> bool {
        let mut listener = self
            .listener
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if listener.is_none() {
            let (stop_tx, stop_rx) = bounded::<()>(0);
            let messages = self.bridge.attach_background();
            let executor = self.executor.clone();

            let spawned = thread::Builder::new()
                .name("taskbell-background".to_string())
                .spawn(move || loop {
                    select! {
                        recv(stop_rx) -> _ => break,
                        recv(messages) -> message => {
                            match message {
                                Ok(ForegroundToBackground::RunCheck) => {
                                    executor.run_check(CheckTrigger::BridgeMessage);
                                }
                                Err(_) => break,
                            }
                        }
                    }
                });

            match spawned {
                Ok(handle) => *listener = Some(ListenerThread { stop_tx, handle }),
                Err(err) => {
                    error!("event=background_activate module=executor status=error error={err}");
                    return false;
                }
            }
        }

        readiness.mark_ready();
        info!("event=background_activate module=executor status=ok");
        true
    }

    /// Stops the message listener.
    pub fn shutdown(&self) {
        let taken = self
            .listener
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(ListenerThread { stop_tx, handle }) = taken {
            drop(stop_tx);
            if handle.join().is_err() {
                error!("event=background_shutdown module=executor status=error reason=listener_panicked");
            }
        }
    }

    /// Handles one periodic wake delivered by the platform.
    pub fn on_periodic_wake(&self, tag: &str) -> WakeOutcome {
        if tag != self.wake_tag {
            debug!("event=periodic_wake module=executor status=skip reason=foreign_tag");
            return WakeOutcome::IgnoredTag;
        }

        let pages = self
            .bridge
            .post_to_clients(BackgroundToForeground::RequestCheck);
        if pages > 0 {
            info!("event=periodic_wake module=executor status=ok action=delegated pages={pages}");
            return WakeOutcome::Delegated { pages };
        }

        info!("event=periodic_wake module=executor status=ok action=local_check");
        WakeOutcome::CheckedLocally(self.executor.run_check(CheckTrigger::PeriodicWake))
    }

    /// Handles one foreground message synchronously.
    pub fn handle_message(&self, message: ForegroundToBackground) -> CheckReport {
        match message {
            ForegroundToBackground::RunCheck => {
                self.executor.run_check(CheckTrigger::BridgeMessage)
            }
        }
    }
}

impl Drop for BackgroundWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
