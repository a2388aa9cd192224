//! Roundtable Player - Main entry point
//!
//! Per-guild playback coordinator: round-robin participant queues with a
//! priority override lane, driving an external audio node over HTTP.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use roundtable_common::events::EventBus;
use roundtable_player::api::{self, AppContext};
use roundtable_player::backend::{BroadcastNotifier, Collaborators, GatewayClient, NodeClient};
use roundtable_player::config::{CliOverrides, Config};
use roundtable_player::SessionController;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for roundtable-player
#[derive(Parser, Debug)]
#[command(name = "roundtable-player")]
#[command(about = "Round-robin playback coordinator for shared voice channels")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "ROUNDTABLE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides bind_addr)
    #[arg(short, long, env = "ROUNDTABLE_BIND")]
    bind: Option<String>,

    /// Log level (overrides [logging] level)
    #[arg(long, env = "ROUNDTABLE_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(
        args.config.as_deref(),
        CliOverrides {
            bind_addr: args.bind,
            log_level: args.log_level,
        },
    )
    .context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Roundtable Player on {}", config.bind_addr);

    let events = EventBus::new(config.event_capacity);
    let node = Arc::new(NodeClient::new(&config.node).context("Failed to create audio node client")?);
    let gateway =
        Arc::new(GatewayClient::new(&config.gateway).context("Failed to create gateway client")?);

    let collaborators = Collaborators {
        voice: gateway,
        backend: node.clone(),
        resolver: node.clone(),
        loader: node,
        notifier: Arc::new(BroadcastNotifier::new(events.clone())),
    };
    let controller = Arc::new(SessionController::new(collaborators, events));
    info!("Session controller initialized");

    api::run(config.bind_addr, AppContext::new(controller), shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
