//! Tracing setup for the binary.
//!
//! - [`init_production`] (`innkeeper run`): daily-rotated JSON file under the
//!   logs directory, plus human-readable stderr.
//! - [`init_cli`] (every other subcommand): stderr only.
//!
//! The filter comes from `RUST_LOG` when set, else from `[general].log_level`.

use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// File name prefix of the rotated JSON log (`innkeeper.log.YYYY-MM-DD`).
pub const LOG_FILE_PREFIX: &str = "innkeeper.log";

/// Keeps the file writer alive; dropping it flushes buffered lines.
pub struct LoggingGuard {
    _file_writer: WorkerGuard,
}

/// `RUST_LOG`, else `default_level`, else `info`.
pub fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install file and console logging for batch runs.
///
/// # Errors
///
/// Fails when the logs directory cannot be created or a global subscriber is
/// already installed.
pub fn init_production(logs_dir: &Path, default_level: &str) -> anyhow::Result<LoggingGuard> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("failed to create logs directory {}", logs_dir.display()))?;

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX));

    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(fmt::layer().json().with_current_span(false).with_writer(file_writer))
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    Ok(LoggingGuard {
        _file_writer: guard,
    })
}

/// Install stderr logging for one-shot subcommands. A second call is a no-op.
pub fn init_cli(default_level: &str) {
    let _ = fmt()
        .with_env_filter(env_filter(default_level))
        .with_writer(std::io::stderr)
        .try_init();
}
