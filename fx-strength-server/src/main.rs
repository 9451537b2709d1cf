mod config;
mod driver;
mod error;
mod feed;
mod protocol;
mod server;

use config::ServerConfig;
use feed::BridgeStatus;
use fx_strength::StrengthService;
use protocol::Broadcast;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Initialize logging
    init_logging();

    info!("Starting fx-strength WebSocket server");

    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    let service = Arc::new(
        StrengthService::new(config.strength.clone())
            .with_dashboard_emit_interval(config.dashboard_emit_interval),
    );

    // Create broadcast channel for strength and dashboard updates
    info!("WebSocket broadcast buffer size: {}", config.buffer_size);
    let (tx, _rx) = broadcast::channel::<Broadcast>(config.buffer_size);

    match config.bridge_url.clone() {
        Some(url) => {
            let (status_tx, status_rx) = watch::channel(BridgeStatus::Disconnected);
            feed::spawn_status_logger(status_rx);
            feed::spawn_bridge_feed(url, service.clone(), status_tx);
        }
        None => info!("PRICE_BRIDGE_WS_URL not set, accepting price pushes from clients only"),
    }

    driver::spawn_driver(service.clone(), tx.clone(), config.update_interval);

    info!("WebSocket server listening on ws://{}", config.addr);

    tokio::select! {
        result = server::start_websocket_server(config.addr, service, tx) => {
            if let Err(e) = result {
                error!("WebSocket server stopped: {}", e);
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }
}

/// Initialize logging
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
