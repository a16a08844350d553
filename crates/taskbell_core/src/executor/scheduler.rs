//! Foreground repeating timer.
//!
//! # Responsibility
//! - Run a delivery pass every `period` while a page is open and the feature
//!   is enabled.
//! - Answer background `RequestCheck` messages while running.
//!
//! # Invariants
//! - The scheduler is an owned object: `start`/`stop`/`dispose` fully define
//!   its lifecycle and dropping it stops the timer thread.
//! - At most one timer thread exists per scheduler.
//! - A disposed scheduler never starts again.

use super::bridge::MessageBridge;
use super::check::CheckReport;
use super::{CheckTrigger, DeliveryExecutor};
use crossbeam_channel::{bounded, select, tick, Sender};
use log::{error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Default foreground check period.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60);

struct TimerThread {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

pub struct ForegroundScheduler {
    executor: DeliveryExecutor,
    bridge: Arc<MessageBridge>,
    period: Duration,
    timer: Mutex<Option<TimerThread>>,
    disposed: AtomicBool,
}

impl ForegroundScheduler {
    pub fn new(executor: DeliveryExecutor, bridge: Arc<MessageBridge>, period: Duration) -> Self {
        Self {
            executor,
            bridge,
            period,
            timer: Mutex::new(None),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Starts the timer and runs one pass immediately on the timer thread.
    ///
    /// Idempotent while running. Returns `false` after `dispose` or when the
    /// thread cannot be spawned.
    pub fn start(&self) -> bool {
        if self.disposed.load(Ordering::SeqCst) {
            return false;
        }

        let mut timer = self.lock_timer();
        if timer.is_some() {
            return true;
        }

        let (stop_tx, stop_rx) = bounded::<()>(0);
        let requests = self.bridge.attach_client();
        let executor = self.executor.clone();
        let period = self.period;

        let spawned = thread::Builder::new()
            .name("taskbell-foreground-timer".to_string())
            .spawn(move || {
                let ticker = tick(period);
                executor.run_check(CheckTrigger::Timer);
                loop {
                    select! {
                        recv(stop_rx) -> _ => break,
                        recv(requests) -> message => {
                            if message.is_err() {
                                break;
                            }
                            executor.run_check(CheckTrigger::BridgeMessage);
                        }
                        recv(ticker) -> _ => {
                            executor.run_check(CheckTrigger::Timer);
                        }
                    }
                }
            });

        match spawned {
            Ok(handle) => {
                info!(
                    "event=scheduler_start module=executor status=ok period_secs={}",
                    period.as_secs()
                );
                *timer = Some(TimerThread { stop_tx, handle });
                true
            }
            Err(err) => {
                error!("event=scheduler_start module=executor status=error error={err}");
                false
            }
        }
    }

    /// Stops the timer and waits for an in-flight pass to finish.
    pub fn stop(&self) {
        let Some(TimerThread { stop_tx, handle }) = self.lock_timer().take() else {
            return;
        };
        drop(stop_tx);
        if handle.join().is_err() {
            error!("event=scheduler_stop module=executor status=error reason=timer_panicked");
            return;
        }
        info!("event=scheduler_stop module=executor status=ok");
    }

    /// Stops and forbids any later `start`.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        self.stop();
    }

    pub fn is_running(&self) -> bool {
        self.lock_timer().is_some()
    }

    /// Runs one pass synchronously on the caller's thread.
    pub fn run_now(&self) -> CheckReport {
        self.executor.run_check(CheckTrigger::Manual)
    }

    fn lock_timer(&self) -> std::sync::MutexGuard<'_, Option<TimerThread>> {
        self.timer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for ForegroundScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
