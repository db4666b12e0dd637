//! Wire protocol for PeerDrop.
//!
//! This crate defines what peers and the relay say to each other:
//!
//! - **Types** ([`Envelope`], [`FileChunk`], [`RoomCode`], [`ChunkMeta`]) —
//!   the messages that travel on the wire.
//! - **Payloads** ([`encode_payload`], [`decode_payload`]) — base64 for
//!   chunk bytes.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — envelopes to and from
//!   frames.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (frames) → Protocol (Envelope) → Rooms (relay)
//! ```

mod codec;
mod error;
mod payload;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use payload::{decode_payload, encode_payload};
pub use types::{ChunkMeta, Envelope, FileChunk, RoomCode};
