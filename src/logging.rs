//! Tracing configuration and log routing.
//!
//! Logs go to stderr through a compact formatter and, when a log file is
//! configured, to that file through a non-blocking writer. `RUST_LOG` overrides
//! the levels derived from the `-v` count and the configured log level.

use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Map the `-v` count to a level name.
pub fn level_for_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Level of the file layer.
///
/// Without `-v` the configured level applies, falling back to `info` when it
/// is not a known level name. With `-v` the file follows the console.
pub fn file_level(verbose: u8, configured: &str) -> &'static str {
    if verbose > 0 {
        return level_for_verbosity(verbose);
    }
    let configured = configured.trim().to_lowercase();
    LEVELS
        .iter()
        .find(|level| **level == configured)
        .copied()
        .unwrap_or("info")
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer when dropped, so the caller
/// keeps it alive until the process exits.
pub fn init_tracing(verbose: u8, log_file: Option<&Path>, log_level: &str) -> Option<WorkerGuard> {
    let console_level = level_for_verbosity(verbose);

    let console_filter = std::env::var("RUST_LOG")
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new(format!("kosei={}", console_level)));
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(console_filter);

    let registry = tracing_subscriber::registry().with(console_layer);

    match log_file.and_then(configure_file_writer) {
        Some((writer, guard)) => {
            let file_filter = std::env::var("RUST_LOG")
                .map(EnvFilter::new)
                .unwrap_or_else(|_| {
                    EnvFilter::new(format!("kosei={}", file_level(verbose, log_level)))
                });
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .compact()
                .with_filter(file_filter);
            registry.with(file_layer).init();
            Some(guard)
        }
        None => {
            registry.init();
            None
        }
    }
}

/// Build a non-blocking writer appending to `path`.
///
/// Returns `None` when the directory cannot be created or the file cannot be opened.
fn configure_file_writer(path: &Path) -> Option<(NonBlocking, WorkerGuard)> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(err) = std::fs::create_dir_all(parent) {
            eprintln!("Failed to create log directory {}: {}", parent.display(), err);
            return None;
        }
    }

    match std::fs::OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(tracing_appender::non_blocking(file)),
        Err(err) => {
            eprintln!("Failed to open log file {}: {}", path.display(), err);
            None
        }
    }
}
