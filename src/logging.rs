//! Logging configuration for querydock.
//!
//! Logs go to stderr by default so stdout carries only query results. A log
//! file can be chosen instead for long-running or scripted use.

use std::fs::{self, File};
use std::path::Path;
use tracing_subscriber::EnvFilter;

use crate::error::{QueryDockError, Result};

/// Filter from `RUST_LOG`, defaulting to `info`.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initializes logging to stderr.
pub fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

/// Initializes logging to `path`, truncating it.
pub fn init_file_logging(path: &Path) -> Result<()> {
    let log_file = open_log_file(path)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(log_file)
        .with_ansi(false) // No ANSI colors in file output
        .init();
    Ok(())
}

/// Creates the log file and any missing parent directories.
fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            QueryDockError::config(format!(
                "Could not create log directory {}: {e}",
                parent.display()
            ))
        })?;
    }
    File::create(path).map_err(|e| {
        QueryDockError::config(format!("Could not create log file {}: {e}", path.display()))
    })
}
