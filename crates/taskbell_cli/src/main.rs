//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `taskbell_core` linkage.
//! - Run one delivery pass or list the schedule of a database.
//!
//! Configuration comes from `./taskbell.toml` (optional) and `TASKBELL_*`
//! environment variables; logs go to `./logs`.

use chrono::{Local, TimeZone};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use taskbell_core::{
    check_and_execute, init_logging, DisplayError, EngineConfig, NotificationPayload,
    NotificationPlatform, NotificationStore, PeriodicWakeRegistration, PermissionState,
    PlatformCapability, PlatformError,
};

const CONFIG_FILE_NAME: &str = "taskbell.toml";
const LOG_DIR_NAME: &str = "logs";

/// Prints notifications to stdout instead of showing them.
struct ConsolePlatform;

impl NotificationPlatform for ConsolePlatform {
    fn supports(&self, capability: PlatformCapability) -> bool {
        capability == PlatformCapability::Notification
    }

    fn permission_state(&self) -> PermissionState {
        PermissionState::Granted
    }

    fn request_permission(&self) -> PermissionState {
        PermissionState::Granted
    }

    fn show(&self, payload: &NotificationPayload) -> Result<(), DisplayError> {
        println!("[{}] {}: {}", payload.tag, payload.title, payload.body);
        Ok(())
    }

    fn register_runtime(&self) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported(PlatformCapability::BackgroundRuntime))
    }

    fn register_periodic_wake(
        &self,
        _registration: &PeriodicWakeRegistration,
    ) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported(PlatformCapability::PeriodicWake))
    }

    fn unregister_periodic_wake(&self, _tag: &str) -> Result<(), PlatformError> {
        Ok(())
    }
}

fn main() -> ExitCode {
    println!("taskbell_core version={}", taskbell_core::core_version());

    let work_dir = std::env::current_dir().unwrap_or_else(|_| std::env::temp_dir());
    let config = EngineConfig::load(Some(work_dir.join(CONFIG_FILE_NAME).as_path()));
    let log_dir = work_dir.join(LOG_DIR_NAME);
    if let Err(err) = init_logging(&config.log_level, &log_dir.to_string_lossy()) {
        eprintln!("logging disabled: {err}");
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        return ExitCode::SUCCESS;
    }
    let Some((command, db_path)) = parse_args(&args, &work_dir, &config) else {
        return usage();
    };

    match command {
        Command::Check => {
            let store = open_store(&db_path);
            let report = check_and_execute(&store, &ConsolePlatform, &Local::now());
            println!(
                "checked={} displayed={} failed={} removed={} rearmed={}",
                report.checked,
                report.displayed.len(),
                report.failed.len(),
                report.removed,
                report.rearmed.as_deref().unwrap_or("-")
            );
            ExitCode::SUCCESS
        }
        Command::List => {
            let store = open_store(&db_path);
            for entry in store.get_all() {
                let at = Local
                    .timestamp_millis_opt(entry.scheduled_time)
                    .single()
                    .map(|time| time.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| entry.scheduled_time.to_string());
                println!("{at} {} {}", entry.kind, entry.id);
            }
            ExitCode::SUCCESS
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Check,
    List,
}

/// `<command> [db_path]`; the path defaults to `db_file_name` in `work_dir`.
fn parse_args(args: &[String], work_dir: &Path, config: &EngineConfig) -> Option<(Command, PathBuf)> {
    let (command, db_path) = match args {
        [command] => (command, work_dir.join(&config.db_file_name)),
        [command, db_path] => (command, PathBuf::from(db_path)),
        _ => return None,
    };
    let command = match command.as_str() {
        "check" => Command::Check,
        "list" => Command::List,
        _ => return None,
    };
    Some((command, db_path))
}

fn usage() -> ExitCode {
    eprintln!("usage: taskbell_cli [check|list [db_path]]");
    ExitCode::from(2)
}

fn open_store(db_path: &Path) -> NotificationStore {
    let store = NotificationStore::open(db_path);
    if !store.is_available() {
        eprintln!("store unavailable at {}; nothing to do", db_path.display());
    }
    store
}
