//! Error types for the BrawlNet client.

use thiserror::Error;

/// Errors that can occur when using the BrawlNet client.
#[derive(Debug, Error)]
pub enum BrawlNetError {
    /// Failed to send a message through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a message from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed unexpectedly.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a protocol message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Attempted an operation that requires an open channel, but the client is not connected.
    ///
    /// This is a precondition failure, distinct from [`Timeout`](Self::Timeout)
    /// and from a server rejection: nothing was sent over the wire.
    #[error("not connected to server")]
    NotConnected,

    /// Attempted a room operation but the client is not in a room.
    #[error("not in a room")]
    NotInRoom,

    /// The server rejected the authentication handshake.
    #[error("authentication failed: {reason}")]
    AuthenticationFailed {
        /// Server-supplied rejection reason.
        reason: String,
        /// Structured error code, if provided by the server.
        error_code: Option<String>,
    },

    /// The server returned an error message.
    #[error("server error: {message}")]
    ServerError {
        /// Human-readable error message from the server.
        message: String,
        /// Structured error code, if provided by the server.
        error_code: Option<String>,
    },

    /// The static-configuration bootstrap reported failure.
    ///
    /// Fatal to startup: the caller should not open a connection after
    /// receiving this.
    #[error("server configuration unavailable: {0}")]
    ConfigUnavailable(String),

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for BrawlNet client operations.
pub type Result<T> = std::result::Result<T, BrawlNetError>;
