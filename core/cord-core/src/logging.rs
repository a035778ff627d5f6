//! Opt-in file logging for embedded hosts.
//!
//! The host owns the terminal, so the library never writes to stdout or
//! stderr. Logs go to a daily-rolling file only when `PresenceConfig` carries
//! a filter (`CORD_DEBUG_LOG` or `CORD_LOG`).

use std::path::Path;

use once_cell::sync::OnceCell;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

use crate::config::PresenceConfig;

const LOG_FILE_PREFIX: &str = "cord.log";

static LOG_GUARD: OnceCell<Option<WorkerGuard>> = OnceCell::new();

/// Installs the global file subscriber once per process.
///
/// Returns whether file logging is active. Later calls return the outcome of
/// the first one.
pub fn init_file_logging(config: &PresenceConfig) -> bool {
    LOG_GUARD
        .get_or_init(|| {
            let filter = config.log_filter.as_deref()?;
            let dir = config.log_dir.as_deref()?;
            // Nowhere to report a failure; the bridge just runs unlogged.
            install(dir, filter).ok()
        })
        .is_some()
}

fn install(dir: &Path, filter: &str) -> Result<WorkerGuard, String> {
    std::fs::create_dir_all(dir)
        .map_err(|err| format!("Failed to create {}: {}", dir.display(), err))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .build(dir)
        .map_err(|err| format!("Failed to open log file: {}", err))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .with_thread_names(true)
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| format!("Failed to install subscriber: {}", err))?;

    Ok(guard)
}
