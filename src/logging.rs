//! Subscriber setup for applications embedding the client.
//!
//! The library itself only emits `tracing` events: round trips at `debug`,
//! authentication and job submission at `info`, leaked handles at `warn`.
//! Tokens and passwords never appear in any event.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::error::{Db2Error, Result};

/// Directive used when neither `DB2_REST_LOG` nor `RUST_LOG` is set.
pub const DEFAULT_DIRECTIVE: &str = "info";

const APP_DIR: &str = "db2-rest";
const LOG_FILE: &str = "db2-rest.log";

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// Truncated on every init.
    File(PathBuf),
}

/// Installs a global fmt subscriber writing to `target`.
///
/// Returns `Ok(false)` when another subscriber was installed first; the
/// existing one is left alone.
pub fn init(target: &LogTarget) -> Result<bool> {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter());
    let installed = match target {
        LogTarget::Stderr => builder.with_writer(std::io::stderr).try_init(),
        LogTarget::File(path) => {
            let file = create_log_file(path)?;
            builder
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .try_init()
        }
    };
    Ok(installed.is_ok())
}

/// Logs to stderr. Safe to call more than once.
pub fn init_stderr_logging() {
    let _ = init(&LogTarget::Stderr);
}

/// Logs to [`get_log_path`], returning the path written to.
pub fn init_file_logging() -> Result<PathBuf> {
    let path = get_log_path();
    init(&LogTarget::File(path.clone()))?;
    Ok(path)
}

/// `DB2_REST_LOG`, then `RUST_LOG`, then [`DEFAULT_DIRECTIVE`].
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env("DB2_REST_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

fn create_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            Db2Error::config(format!("Cannot create log directory {}: {e}", parent.display()))
        })?;
    }
    File::create(path)
        .map_err(|e| Db2Error::config(format!("Cannot create log file {}: {e}", path.display())))
}

/// Log file location: the XDG state dir on Linux, the config dir elsewhere,
/// the temp dir as a last resort.
pub fn get_log_path() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::config_dir)
        .map(|dir| dir.join(APP_DIR).join(LOG_FILE))
        .unwrap_or_else(|| std::env::temp_dir().join(LOG_FILE))
}
