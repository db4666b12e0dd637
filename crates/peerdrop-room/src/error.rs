//! Error types for the room layer.

use peerdrop_protocol::{ProtocolError, RoomCode};

/// Errors that can occur during room operations.
///
/// Only [`RoomError::NotFound`] and [`RoomError::OwnRoom`] are ever
/// reported back to a peer; the rest are logged and dropped.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No active room has this code.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// The sender of a chunk is not the room's host.
    #[error("connection is not the host of room {0}")]
    NotHost(RoomCode),

    /// A host tried to join the room it is hosting.
    #[error("connection already hosts room {0}")]
    OwnRoom(RoomCode),

    /// The room was torn down while the operation was in flight.
    #[error("room {0} is closed")]
    Closed(RoomCode),

    /// An envelope could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Writing to a peer failed.
    #[error("send failed: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}
