use std::net::SocketAddr;
use thiserror::Error;

/// All errors generated in `fx-strength-server`.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind WebSocket server to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
