//! Error types for the notification hub and remote reporters.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HubError>;

#[derive(Debug, Error)]
pub enum HubError {
    /// Invalid options; includes the fatal half-TLS-pair case.
    #[error("configuration error: {0}")]
    Config(#[from] relume_config::ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("WebSocket error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("connection closed before the hub acknowledged the frame")]
    ClosedBeforeAck,

    #[error("timed out waiting for the hub's acknowledgment")]
    AckTimeout,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
