//! Error types for the auction client.

use thiserror::Error;

/// Client-specific errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The WebSocket handshake never completed.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// An established connection broke mid-session.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),
}
