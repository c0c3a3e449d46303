//! Transport error types.

use thiserror::Error;
use tokio_tungstenite::tungstenite;

use crate::protocol::CodecError;

/// Errors from the transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The page URL cannot be turned into a socket address.
    #[error("Invalid page URL '{url}': {reason}")]
    InvalidAddress {
        /// The URL as given.
        url: String,
        /// Why it was refused.
        reason: String,
    },

    /// WebSocket-level failure.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// A frame could not be encoded or decoded.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// The transport task has stopped.
    #[error("Transport is shut down")]
    Closed,
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
