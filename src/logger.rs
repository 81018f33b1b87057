//! Logging module for the analytics engine.

use chrono::Local;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::setting::SETTINGS;

/// Log level constants
pub const DEBUG: i32 = 10;
pub const INFO: i32 = 20;
pub const WARNING: i32 = 30;
pub const ERROR: i32 = 40;

/// Convert integer log level to tracing Level
pub fn level_from_int(level: i32) -> Level {
    match level {
        0..=10 => Level::DEBUG,
        11..=20 => Level::INFO,
        21..=30 => Level::WARN,
        _ => Level::ERROR,
    }
}

/// Initialize the logger
pub fn init_logger() {
    let log_level = SETTINGS.get_int("log.level").unwrap_or(INFO as i64) as i32;
    let log_console = SETTINGS.get_bool("log.console").unwrap_or(true);
    let log_file = SETTINGS.get_bool("log.file").unwrap_or(false);

    let level = level_from_int(log_level);
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let subscriber = tracing_subscriber::registry().with(filter);

    if log_console {
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_ansi(true);

        if log_file {
            let log_path = get_log_file_path();

            if let Some(parent) = log_path.parent() {
                let _ = fs::create_dir_all(parent);
            }

            if let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_path) {
                let file_layer = fmt::layer()
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false);

                subscriber.with(fmt_layer).with(file_layer).init();
            } else {
                subscriber.with(fmt_layer).init();
            }
        } else {
            subscriber.with(fmt_layer).init();
        }
    } else if log_file {
        let log_path = get_log_file_path();

        if let Some(parent) = log_path.parent() {
            let _ = fs::create_dir_all(parent);
        }

        if let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_path) {
            let file_layer = fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false);

            subscriber.with(file_layer).init();
        }
    }
}

/// Get the log file path for today
fn get_log_file_path() -> PathBuf {
    let folder = std::env::var("ANALYTICS_ENGINE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("log");
    let today = Local::now().format("%Y%m%d").to_string();
    folder.join(format!("analytics_{}.log", today))
}
