//! roomctl
//!
//! Meeting-room device controller: keeps the room's AV hardware monitored
//! and serves the REST control plane.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use roomctl_api::{AppState, HealthFeed, build_router, load_config, setup_logging};
use roomctl_hardware::ModuleManager;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "roomctl")]
#[command(author, version, about = "Meeting-room AV device controller")]
#[command(long_about = "
Keeps the room's displays, lighting, cameras, audio endpoints and
conferencing codec in a monitored state and exposes them over REST.

EXAMPLES:
    # Run against real hardware
    roomctl --config /etc/roomctl/room.toml

    # Override the listen address
    roomctl --config room.toml --bind 0.0.0.0:8085

    # Debug logging
    RUST_LOG=roomctl_hardware=debug roomctl --config room.toml
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: PathBuf,

    /// Listen address, overriding `server.bind_addr`
    #[arg(short, long, value_name = "ADDR")]
    bind: Option<std::net::SocketAddr>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args.config).context("Failed to load configuration")?;

    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.server.log_level);
    setup_logging(log_level).context("Failed to setup logging")?;

    info!("roomctl v{}", env!("CARGO_PKG_VERSION"));

    let manager = Arc::new(ModuleManager::build_from_config(&config.room));
    let feed = HealthFeed::new(config.server.event_history);
    let feed_task = feed.spawn(manager.subscribe());

    let report = manager.initialize_all().await;
    if !report.all_ok() {
        warn!(failed = ?report.failed, "Some modules failed to initialize");
    }
    manager.start_monitoring_all();

    let bind_addr = args.bind.unwrap_or(config.server.bind_addr);
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    info!("Control plane listening on http://{}", bind_addr);

    let app = build_router(AppState::new(Arc::clone(&manager), feed));
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    if let Err(e) = &served {
        error!("HTTP server error: {}", e);
    }

    info!("Shutting down modules...");
    manager.shutdown_all().await;
    feed_task.abort();

    served.context("HTTP server failed")
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
