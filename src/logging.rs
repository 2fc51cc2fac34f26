//! Logging setup for the application.
//!
//! Server and CLI commands log to stderr. The dashboard owns the terminal, so
//! it appends to a single `taxipred-dashboard.log` in the log directory
//! instead; the non-blocking writer's guard is kept alive for the whole process.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

const LOG_FILE_NAME: &str = "taxipred-dashboard.log";
const DEFAULT_FILTER: &str = "info";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// A log file inside this directory.
    File(PathBuf),
}

/// Errors that may occur while initializing logging.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// Failed to create or access the log directory.
    #[error("Failed to prepare log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to create or open the log file.
    #[error("Failed to create log file at {path}: {source}")]
    CreateLogFile {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to set the global tracing subscriber.
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Initialize the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Subsequent calls
/// after a successful file init are no-ops.
pub fn init(target: &LogTarget) -> Result<(), LoggingError> {
    if LOG_GUARD.get().is_some() {
        return Ok(());
    }

    match target {
        LogTarget::Stderr => {
            let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
            let subscriber = Registry::default().with(build_env_filter()).with(layer);
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogTarget::File(dir) => {
            let log_path = prepare_log_file(dir)?;
            let appender = rolling::never(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            let subscriber = Registry::default().with(build_env_filter()).with(layer);
            tracing::subscriber::set_global_default(subscriber)?;
            let _ = LOG_GUARD.set(guard);
            tracing::info!("Logging initialized; log file at {}", log_path.display());
        }
    }
    Ok(())
}

fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn prepare_log_file(dir: &Path) -> Result<PathBuf, LoggingError> {
    fs::create_dir_all(dir).map_err(|source| LoggingError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(LOG_FILE_NAME);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|source| LoggingError::CreateLogFile {
            path: path.clone(),
            source,
        })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_is_reused_across_launches() {
        let dir = tempfile::tempdir().unwrap();
        let first = prepare_log_file(dir.path()).unwrap();
        fs::write(&first, "earlier launch\n").unwrap();

        let second = prepare_log_file(dir.path()).unwrap();
        assert_eq!(first, second);
        assert_eq!(fs::read_to_string(&second).unwrap(), "earlier launch\n");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn prepare_log_file_creates_nested_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        let path = prepare_log_file(&nested).unwrap();
        assert!(path.exists());
        assert!(path.ends_with(LOG_FILE_NAME));
    }
}
