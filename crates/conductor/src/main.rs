//! Conductor entry point.

mod cli;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use conductor_api::{serve_with_shutdown, AppState};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let state = AppState::new(cli.api_config(), cli.supervisor_config(), cli.rpc_config());
    let supervisor = state.supervisor.clone();

    std::fs::create_dir_all(&supervisor.config().agents_dir)?;
    info!(
        agents_dir = %supervisor.config().agents_dir.display(),
        callback_url = %supervisor.config().callback_url,
        "starting conductor"
    );

    serve_with_shutdown(state, shutdown_signal()).await?;

    info!("shutting down, stopping agents");
    supervisor.stop_all().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
