mod cli;

use clap::Parser;
use color_eyre::Result;

use cashflow::config::Config;
use cashflow::logging;
use cashflow::session::Session;

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = cli::Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(&config.log)?;

  // Build providers once; the storage backend is fixed from here on
  let session = Session::from_config(&config)?;
  tracing::info!(base_url = %config.api.base_url, "Session ready");

  cli::run(args.command, &session).await
}
