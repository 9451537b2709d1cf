//! WebSocket feed handler for an upstream price bridge.
//!
//! The bridge pushes `{"timestamp": ..., "prices": {"EURUSD": 1.1, ...}}`,
//! optionally tagged `"type": "prices"`. Other messages are ignored.

use std::{sync::Arc, time::Duration};

use futures::StreamExt;
use fx_strength::{IngestReport, PricePush, StrengthService};
use tokio::sync::watch;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Connection status for the price bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeStatus {
    Connected,
    Disconnected,
    Reconnecting,
}

/// Parse one bridge message and ingest it when it carries prices.
///
/// Unknown fields, including a `"type"` tag, are ignored, so status and welcome
/// messages parse as pushes without prices.
fn ingest_text(service: &StrengthService, text: &str) -> Option<IngestReport> {
    match serde_json::from_str::<PricePush>(text) {
        Ok(push) if push.prices.is_empty() => {
            debug!("Ignoring bridge message without prices");
            None
        }
        Ok(push) => {
            let at = push.timestamp;
            Some(service.ingest(&push.into_price_map(), at))
        }
        Err(e) => {
            let preview = text.chars().take(100).collect::<String>();
            debug!("Failed to parse bridge message: {} - {}", e, preview);
            None
        }
    }
}

/// Spawn price bridge WebSocket handler
/// Returns a task handle; connection changes are published on `status_tx`
pub fn spawn_bridge_feed(
    url: String,
    service: Arc<StrengthService>,
    status_tx: watch::Sender<BridgeStatus>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting price bridge feed handler for {}", url);

        loop {
            let _ = status_tx.send(BridgeStatus::Reconnecting);

            match connect_async(url.as_str()).await {
                Ok((ws_stream, _)) => {
                    info!("Connected to price bridge at {}", url);
                    let _ = status_tx.send(BridgeStatus::Connected);

                    let (_, mut read) = ws_stream.split();

                    while let Some(msg) = read.next().await {
                        match msg {
                            Ok(Message::Text(text)) => {
                                if let Some(report) = ingest_text(&service, text.as_str()) {
                                    debug!(
                                        at = report.at,
                                        received = report.received,
                                        updated = report.updated,
                                        "Ingested bridge prices"
                                    );
                                }
                            }
                            Ok(Message::Close(_)) => {
                                warn!("Price bridge connection closed");
                                break;
                            }
                            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                                // Heartbeat - handled automatically
                            }
                            Err(e) => {
                                error!("Price bridge error: {}", e);
                                break;
                            }
                            _ => {}
                        }
                    }

                    let _ = status_tx.send(BridgeStatus::Disconnected);
                }
                Err(e) => {
                    error!("Failed to connect to price bridge at {}: {}", url, e);
                    let _ = status_tx.send(BridgeStatus::Disconnected);
                }
            }

            debug!("Waiting {:?} before reconnecting to price bridge...", RECONNECT_DELAY);
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    })
}

/// Log every bridge status change until the feed task stops.
pub fn spawn_status_logger(
    mut status_rx: watch::Receiver<BridgeStatus>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let status = *status_rx.borrow_and_update();
            info!(?status, "Price bridge status changed");
        }
    })
}
