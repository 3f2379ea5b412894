//! Logging setup: stderr, plus an optional log file.

use color_eyre::{eyre::eyre, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Initialize logging.
///
/// RUST_LOG takes precedence; otherwise this crate logs at info, or debug when
/// `verbose` is set. The returned guard must be kept alive for the file writer
/// to flush.
pub fn init(verbose: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
  let level = if verbose { "debug" } else { "info" };
  let filter = || {
    EnvFilter::try_from_default_env()
      .unwrap_or_else(|_| EnvFilter::new(format!("warn,{}={}", env!("CARGO_CRATE_NAME"), level)))
  };

  let (file_layer, guard) = match log_file {
    Some(path) => {
      let file_name = path
        .file_name()
        .ok_or_else(|| eyre!("Invalid log file path: {}", path.display()))?;
      let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
      };

      let appender = tracing_appender::rolling::never(dir, file_name);
      let (writer, guard) = tracing_appender::non_blocking(appender);
      let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_filter(filter());
      (Some(layer), Some(guard))
    }
    None => (None, None),
  };

  tracing_subscriber::registry()
    .with(
      fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(filter()),
    )
    .with(file_layer)
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}
