//! emberkv server entry point.
//!
//! Parses the command line, sets up logging, binds the listener and serves
//! until Ctrl+C.

use clap::Parser;
use emberkv::{Config, Server};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        version = emberkv::VERSION,
        sweep_interval_ms = config.sweep_interval_ms,
        "Starting emberkv"
    );

    // A bind failure propagates out of main and exits non-zero.
    let server = Server::bind(config.bind_address(), config.reclaim_config()).await?;

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C, running until killed");
            std::future::pending::<()>().await;
        }
    };

    server.run_until(shutdown).await;

    info!("Server shutdown complete");
    Ok(())
}
