//! File logging setup for the binary.

use color_eyre::{eyre::eyre, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, LogConfig};

/// Install a global subscriber writing to a daily rolling file.
///
/// `RUST_LOG` overrides the configured level. Keep the returned guard alive
/// for the life of the process or buffered lines are lost.
pub fn init(config: &LogConfig) -> Result<WorkerGuard> {
  let dir = match &config.dir {
    Some(dir) => dir.clone(),
    None => Config::data_dir()?.join("logs"),
  };
  std::fs::create_dir_all(&dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let filter = EnvFilter::try_from_default_env()
    .or_else(|_| EnvFilter::try_new(&config.level))
    .map_err(|e| eyre!("Invalid log filter '{}': {}", config.level, e))?;

  let appender = tracing_appender::rolling::daily(&dir, "cashflow.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .try_init()
    .map_err(|e| eyre!("Failed to install log subscriber: {}", e))?;

  Ok(guard)
}
