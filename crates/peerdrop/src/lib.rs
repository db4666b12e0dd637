//! # PeerDrop
//!
//! Real-time relay for sharing files between browser peers.
//!
//! A host opens a short-lived room and gets a six-digit code. Receivers
//! join with the code, and the host streams a file in chunks that the
//! relay forwards to every receiver as they arrive. Nothing is stored:
//! when the host leaves, the room and its code are gone.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use peerdrop::prelude::*;
//!
//! # async fn start() -> Result<(), ServerError> {
//! let server = PeerdropServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
pub mod logger;
mod server;

pub use config::ServerConfig;
pub use error::ServerError;
pub use server::{PeerdropServer, PeerdropServerBuilder};

/// Re-exports of the most commonly used types.
pub mod prelude {
    pub use crate::{PeerdropServer, PeerdropServerBuilder, ServerConfig, ServerError};
    pub use peerdrop_protocol::{
        decode_payload, encode_payload, ChunkMeta, Codec, Envelope, FileChunk, JsonCodec,
        ProtocolError, RoomCode,
    };
    pub use peerdrop_room::{
        Departure, Membership, RoomError, RoomRegistry, OWN_ROOM, ROOM_NOT_FOUND,
    };
    pub use peerdrop_transport::{
        Connection, ConnectionId, TransportConfig, TransportError, DEFAULT_MAX_MESSAGE_SIZE,
    };
}
