//! Error types for the transport layer.

use std::io;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while listening on, upgrading, or using a socket.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Accepting a TCP stream failed.
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    /// The HTTP upgrade was refused or broke off.
    #[error("upgrade failed: {0}")]
    Upgrade(#[source] BoxError),

    /// The peer sent a frame or message over the configured ceiling.
    #[error("inbound message of {size} bytes exceeds the {max} byte limit")]
    MessageTooLarge { size: usize, max: usize },

    /// The peer is gone.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Writing a frame failed.
    #[error("send failed: {0}")]
    Send(#[source] BoxError),

    /// Reading a frame failed.
    #[error("receive failed: {0}")]
    Receive(#[source] BoxError),

    /// The transport was shut down.
    #[error("transport shut down")]
    Shutdown,
}
