//! Manzai Server - HTTP service that writes manzai scripts.
//!
//! Loads layered configuration, builds the generator and credit gate once,
//! and serves the API until Ctrl-C.

use std::path::PathBuf;

use clap::Parser;
use manzai_server::{AppConfig, AppState, LegacyEnv, init_logging, router};
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Command-line arguments for the manzai server.
#[derive(Parser, Debug)]
#[command(name = "manzai-server")]
#[command(about = "Manzai Server - LLM-backed comedy script generation")]
#[command(version)]
struct Args {
    /// Configuration file (replaces ./manzai.toml)
    #[arg(short, long, env = "MANZAI_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overriding server.bind
    #[arg(long)]
    bind: Option<String>,

    /// Validate configuration, print it without secrets, and exit
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = dotenvy::dotenv() {
        // A missing .env file is the common case.
        if !e.not_found() {
            eprintln!("Ignoring unreadable .env file: {e}");
        }
    }

    let args = Args::parse();
    let mut config = AppConfig::load(args.config.as_deref(), &LegacyEnv::from_env())?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    config.validate()?;

    if args.check_config {
        println!("{}", config.redacted_json()?);
        return Ok(());
    }

    init_logging(&config.logging)?;
    info!(
        environment = %config.server.environment,
        model = %config.model.model,
        "Starting Manzai Server"
    );

    let state = AppState::from_config(&config)?;
    if !state.gate.is_enabled() {
        warn!("No usage store configured - generation is ungated");
    }

    let listener = TcpListener::bind(&config.server.bind).await?;
    info!(address = %listener.local_addr()?, "Listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Manzai Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl-C, shutting down"),
        Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
    }
}
