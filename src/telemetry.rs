//! Tracing subscriber setup for the CLI: env-filtered compact stderr output
//! plus a plain-text file log under the base directory.

use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Second-resolution UTC timestamps (`2026-03-14T09:41:07Z`). Sub-second
/// precision is noise for an indexer whose slowest steps are I/O bound.
#[derive(Clone, Copy, Debug, Default)]
struct UtcSeconds;

impl FormatTime for UtcSeconds {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"))
    }
}

/// Installs the global subscriber. `RUST_LOG` wins; the fallback level is
/// `info`. Logging must not break the CLI, so file-log problems only lose
/// the file layer.
pub fn init(base_dir: &Path) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_timer(UtcSeconds)
        .with_target(true)
        .with_ansi(io::stderr().is_terminal())
        .compact();

    let file_layer = open_log_file(base_dir).map(|file| {
        fmt::layer()
            .with_writer(Arc::new(file))
            .with_timer(UtcSeconds)
            .with_target(true)
            .with_ansi(false)
            .compact()
            .boxed()
    });

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer);
    match file_layer {
        Some(layer) => registry.with(layer).init(),
        None => registry.init(),
    }
}

fn open_log_file(base_dir: &Path) -> Option<std::fs::File> {
    let logs = base_dir.join("logs");
    std::fs::create_dir_all(&logs).ok()?;
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(logs.join("bcindex.log"))
        .ok()
}
