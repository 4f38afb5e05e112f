//! reclaimd - retention-gated trash service.

use anyhow::{Context, Result};
use clap::Parser;
use reclaim_core::types::AppConfig;
use reclaim_core::{FsObjectStore, SystemClock};
use reclaim_server::logging::init_logging;
use reclaim_server::sweep::spawn_sweeper;
use reclaim_server::{AppState, create_router};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "reclaimd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "RECLAIM_CONFIG", default_value = "reclaim.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = AppConfig::load(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    init_logging(&config.logging).context("failed to initialize logging")?;
    tracing::info!("reclaimd v{}", env!("CARGO_PKG_VERSION"));

    let errors = config.validate();
    for error in &errors {
        tracing::warn!(config_path = %args.config.display(), "{error}; using default");
    }
    let config = config.with_defaults_for_invalid();

    if config.auth.tokens.is_empty() {
        tracing::warn!("no auth tokens configured; every API call will be rejected");
    }

    let store = Arc::new(
        FsObjectStore::new(&config.storage.objects_dir).context("failed to open object store")?,
    );
    let state = AppState::open(&config, store, Arc::new(SystemClock))
        .context("failed to open trash ledger")?;

    let _sweeper = if config.sweep.enabled {
        let core = config.core_config()?;
        Some(spawn_sweeper(state.trash.clone(), core.sweep.interval))
    } else {
        None
    };

    let listener = tokio::net::TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.server.listen))?;
    tracing::info!(addr = %config.server.listen, "listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
