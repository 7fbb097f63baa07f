//! Logging sink for a test run.
//!
//! Two layers on one `tracing` registry:
//! - **console**: human-readable, filtered by `RUST_LOG` (default `info`).
//! - **file**: daily rolling `Logs/test-log.YYYY-MM-DD` written through a
//!   non-blocking appender.
//!
//! The appender's worker guard lives in [`LogSink`]. Dropping the sink
//! flushes buffered lines and closes the file, which is how the run's
//! teardown closes logging.

use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Directory for rolling log files, relative to the working directory.
pub const LOG_DIR: &str = "Logs";

/// Log file prefix; the appender adds the date suffix.
pub const LOG_FILE_PREFIX: &str = "test-log";

/// Open logging sink. Drop to flush and close the file layer.
#[must_use = "dropping the sink closes the log file"]
pub struct LogSink {
    dir: PathBuf,
    _guard: Option<WorkerGuard>,
}

impl LogSink {
    /// Directory the file layer writes into.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl std::fmt::Debug for LogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSink").field("dir", &self.dir).finish()
    }
}

/// Opens the console + rolling file sink under [`LOG_DIR`].
pub fn init() -> LogSink {
    init_in(LOG_DIR)
}

/// Opens the console + rolling file sink under `dir`.
///
/// Installing the global subscriber only succeeds once per process. Later
/// calls (a second run in the same process, or a test that installed its own
/// subscriber) keep the existing subscriber and return a sink without a file
/// guard.
pub fn init_in(dir: impl Into<PathBuf>) -> LogSink {
    let dir = dir.into();
    // Best effort: a missing log directory should not stop the run.
    let _ = std::fs::create_dir_all(&dir);

    let file_appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = fmt::layer()
        .with_target(false)
        .with_filter(console_filter);

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    let installed = tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .is_ok();

    if !installed {
        tracing::debug!("Global subscriber already installed; reusing it");
    }

    LogSink {
        dir,
        _guard: installed.then_some(guard),
    }
}
