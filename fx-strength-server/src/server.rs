use crate::{
    error::ServerError,
    protocol::{Broadcast, Outbound, Subscriptions, handle_text},
};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use fx_strength::StrengthService;
use std::{net::SocketAddr, sync::Arc};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::{broadcast, mpsc, watch},
};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Bind `addr` and serve WebSocket clients until the listener fails.
pub async fn start_websocket_server(
    addr: SocketAddr,
    service: Arc<StrengthService>,
    tx: broadcast::Sender<Broadcast>,
) -> Result<(), ServerError> {
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    info!("WebSocket server bound to {}", addr);
    serve(listener, service, tx).await;
    Ok(())
}

/// Accept clients from an already bound `listener`.
pub async fn serve(
    listener: TcpListener,
    service: Arc<StrengthService>,
    tx: broadcast::Sender<Broadcast>,
) {
    while let Ok((stream, peer_addr)) = listener.accept().await {
        info!("New WebSocket connection from {}", peer_addr);
        tokio::spawn(handle_client(stream, peer_addr, service.clone(), tx.clone()));
    }
}

/// Handle individual WebSocket client connection
async fn handle_client(
    stream: TcpStream,
    peer_addr: SocketAddr,
    service: Arc<StrengthService>,
    tx: broadcast::Sender<Broadcast>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            error!("WebSocket handshake failed for {}: {}", peer_addr, ServerError::from(e));
            return;
        }
    };

    info!("WebSocket handshake completed for {}", peer_addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let mut rx = tx.subscribe();

    // Welcome, then the current state
    let greeting = [
        Outbound::welcome(),
        Outbound::StrengthInitial(service.latest_strengths(Utc::now().timestamp_millis())),
        Outbound::DashboardInitial(service.latest_dashboard()),
    ];
    for outbound in greeting {
        match outbound.to_json() {
            Ok(json) => {
                if ws_sender.send(Message::Text(json.into())).await.is_err() {
                    warn!("Failed to greet {}", peer_addr);
                    return;
                }
            }
            Err(e) => error!("Failed to serialise greeting for {}: {}", peer_addr, e),
        }
    }

    let (subscriptions_tx, subscriptions_rx) = watch::channel(Subscriptions::default());
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<Outbound>();

    // Spawn task to send subscribed broadcasts and direct replies to this client
    let mut send_task = tokio::spawn(async move {
        loop {
            let json = tokio::select! {
                reply = reply_rx.recv() => match reply {
                    Some(outbound) => match outbound.to_json() {
                        Ok(json) => json,
                        Err(e) => {
                            error!("Failed to serialise reply for {}: {}", peer_addr, e);
                            continue;
                        }
                    },
                    None => break,
                },
                event = rx.recv() => match event {
                    Ok(message) => {
                        if !subscriptions_rx.borrow().contains(message.topic) {
                            continue;
                        }
                        message.json.to_string()
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Client fell behind: newer snapshots supersede the skipped ones
                        warn!("Client {} lagged, skipped {} messages", peer_addr, skipped);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Broadcast channel closed for {}", peer_addr);
                        break;
                    }
                },
            };

            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Handle requests from the client
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Ok(Message::Ping(_)) => {
                    debug!("Received ping from {}", peer_addr);
                }
                Ok(Message::Text(text)) => {
                    let mut subscriptions = *subscriptions_tx.borrow();
                    let reply = handle_text(&service, &mut subscriptions, text.as_str());
                    subscriptions_tx.send_replace(subscriptions);

                    if let Some(reply) = reply {
                        if reply_tx.send(reply).is_err() {
                            break;
                        }
                    }
                }
                Err(e) => {
                    error!("WebSocket error for {}: {}", peer_addr, ServerError::from(e));
                    break;
                }
                _ => {}
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = &mut send_task => {
            info!("Send task completed for {}", peer_addr);
            recv_task.abort();
        }
        _ = &mut recv_task => {
            info!("Receive task completed for {}", peer_addr);
            send_task.abort();
        }
    }

    info!("WebSocket connection closed for {}", peer_addr);
}
