//! Tracing subscriber setup. The terminal belongs to the TUI, so all
//! diagnostics go to a log file.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber writing to `log_file_path`.
///
/// Returns false when the file cannot be opened; the program runs on
/// without logging in that case.
pub fn init_global(log_file_path: &Path) -> bool {
    if let Some(parent) = log_file_path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let Ok(log_file) = OpenOptions::new().create(true).append(true).open(log_file_path) else {
        return false;
    };
    build_subscriber(log_file).try_init().is_ok()
}

/// RUST_LOG wins; otherwise info and above.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn build_subscriber(log_file: File) -> impl tracing::Subscriber + Send + Sync {
    let fmt_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry().with(fmt_layer).with(env_filter())
}
