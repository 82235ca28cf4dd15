//! Logging initialisation for qemu-launch.
//!
//! When the `QEMU_LAUNCH_LOG` environment variable is set to `1`, structured
//! logs are also written to `qemu-launch.log` in the log directory resolved by
//! [`LauncherPaths`]. Otherwise only stderr output (filtered by `RUST_LOG`) is
//! enabled.
//!
//! Returns a guard that must be kept alive for the duration of the process
//! so that buffered log lines are flushed on exit.

use std::path::PathBuf;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::paths::LauncherPaths;

pub const LOG_ENV: &str = "QEMU_LAUNCH_LOG";
const LOG_FILE: &str = "qemu-launch.log";

pub struct LogGuard {
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Initialise the global tracing subscriber.
///
/// Call once from `main`, store the returned `LogGuard` in a local variable
/// for the duration of the process.
pub fn init(paths: Option<&LauncherPaths>) -> LogGuard {
    let file_guard = if std::env::var(LOG_ENV).as_deref() == Ok("1") {
        let dir = paths
            .map(|p| p.logs.clone())
            .unwrap_or_else(std::env::temp_dir);
        let _ = std::fs::create_dir_all(&dir);
        let (non_blocking, guard) = file_writer(dir);

        let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

        tracing_subscriber::registry()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(file_layer)
            .init();

        Some(guard)
    } else {
        tracing_subscriber::registry()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();

        None
    };

    LogGuard {
        _file_guard: file_guard,
    }
}

fn file_writer(
    dir: PathBuf,
) -> (
    tracing_appender::non_blocking::NonBlocking,
    tracing_appender::non_blocking::WorkerGuard,
) {
    let file_appender = tracing_appender::rolling::never(dir, LOG_FILE);
    tracing_appender::non_blocking(file_appender)
}
