//! Logging setup
//!
//! While the TUI owns the terminal everything goes to a daily rolling JSON
//! log file; this file is the "console" the error banner points users to.
//! One-shot commands log to stderr instead.

use std::fs;
use std::io;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_FILE_NAME: &str = "promtior-chat.log";

pub fn log_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("promtior-chat").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// `RUST_LOG` wins over the configured level.
fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// File-only logging for TUI mode. The returned guard must be kept alive
/// until shutdown so buffered lines get flushed.
pub fn init_tui(default_level: &str) -> WorkerGuard {
    let log_dir = log_dir();
    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("Failed to create logs directory: {}", e);
    }

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .json()
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .with_filter(env_filter(default_level));

    // No stdout layer: ratatui draws on the terminal
    tracing_subscriber::registry().with(file_layer).init();

    tracing::info!(
        "Logging initialized. Writing to: {:?} (daily rolling)",
        log_dir.join(LOG_FILE_NAME)
    );

    guard
}

pub fn init_stderr(default_level: &str) {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(io::stderr)
        .with_filter(env_filter(default_level));

    tracing_subscriber::registry().with(stderr_layer).init();
}
