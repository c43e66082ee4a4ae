//! quicdrop entry point.

mod app;
mod args;

use clap::Parser;
use quicdrop_transfer::TransferConfig;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let args = args::Args::parse();

    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,quicdrop=debug")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting quicdrop");

    let config = match &args.config {
        Some(path) => {
            let config = TransferConfig::load(path)?;
            tracing::info!(path = %path.display(), chunk_size = config.chunk_size, "configuration loaded");
            config
        }
        None => TransferConfig::default(),
    };

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(&args, &config))?;

    Ok(())
}
