//! Unified error type for the PeerDrop server.

use peerdrop_protocol::ProtocolError;
use peerdrop_room::RoomError;
use peerdrop_transport::TransportError;

/// Top-level error that wraps every layer's error.
///
/// The `#[from]` attribute on each variant lets `?` convert layer errors
/// automatically.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// A transport-level error (bind, upgrade, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, bad payload).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (unknown room, not the host).
    #[error(transparent)]
    Room(#[from] RoomError),
}
