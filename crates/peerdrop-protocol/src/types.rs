//! Core protocol types for PeerDrop's wire format.
//!
//! Every frame on a peer's socket is exactly one [`Envelope`], encoded as a
//! flat JSON object whose `"type"` field names the message. Browser peers
//! leave out fields that are empty, so everything a peer may omit decodes
//! to its default.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::payload::{decode_payload, encode_payload};
use crate::ProtocolError;

// ---------------------------------------------------------------------------
// RoomCode
// ---------------------------------------------------------------------------

/// The short, human-typeable identifier of a room.
///
/// Codes are six decimal digits so a receiver can read one off the
/// sender's screen. They are unique among *active* rooms only: once a
/// room closes its code may be drawn again.
///
/// `#[serde(transparent)]` keeps it a plain JSON string: `"042917"`.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct RoomCode(pub String);

impl RoomCode {
    /// Number of digits in a generated code.
    pub const LEN: usize = 6;

    /// Draws a random code. Callers must check it against the active rooms.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let code = (0..Self::LEN)
            .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
            .collect();
        Self(code)
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomCode {
    fn from(code: &str) -> Self {
        Self(code.to_string())
    }
}

// ---------------------------------------------------------------------------
// ChunkMeta
// ---------------------------------------------------------------------------

/// Metadata that travels with one file chunk from the host.
///
/// `file_size` and `total_chunks` are what the host *declared*; the relay
/// never checks them, they only help receivers rebuild the file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChunkMeta {
    pub file_name: String,
    pub file_type: String,
    pub file_size: u64,
    /// 1-based position of this chunk in the file.
    pub chunk_index: u64,
    pub total_chunks: u64,
    pub is_first_chunk: bool,
    pub is_last_chunk: bool,
}

// ---------------------------------------------------------------------------
// FileChunk
// ---------------------------------------------------------------------------

fn is_false(value: &bool) -> bool {
    !*value
}

/// The body of a `file_chunk` envelope.
///
/// `file_data` holds the chunk bytes as base64 text. Inbound chunks may use
/// either base64 alphabet, with or without padding; chunks the relay sends
/// out always use the URL-safe alphabet without padding.
///
/// File name, type and size only ride on the first chunk of a transfer, so
/// they are optional and skipped when absent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChunk {
    #[serde(default)]
    pub room_id: RoomCode,

    #[serde(default)]
    pub file_data: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,

    #[serde(default)]
    pub chunk_index: u64,

    #[serde(default)]
    pub total_chunks: u64,

    #[serde(default, skip_serializing_if = "is_false")]
    pub is_first_chunk: bool,

    #[serde(default)]
    pub is_last_chunk: bool,
}

impl FileChunk {
    /// Builds a chunk from raw bytes and metadata, the way the relay
    /// forwards it to receivers.
    ///
    /// Only a first chunk carries the file name, type, size and the
    /// `isFirstChunk` flag. `isLastChunk` is passed through as given.
    pub fn relayed(room_id: &RoomCode, payload: &[u8], meta: &ChunkMeta) -> Self {
        let first = meta.is_first_chunk;
        Self {
            room_id: room_id.clone(),
            file_data: encode_payload(payload),
            file_name: first.then(|| meta.file_name.clone()),
            file_type: first.then(|| meta.file_type.clone()),
            file_size: first.then_some(meta.file_size),
            chunk_index: meta.chunk_index,
            total_chunks: meta.total_chunks,
            is_first_chunk: first,
            is_last_chunk: meta.is_last_chunk,
        }
    }

    /// Decodes the base64 payload and splits the chunk into the target
    /// room, the raw bytes, and the metadata.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidPayload`] if `file_data` is not
    /// valid base64 in either alphabet.
    pub fn into_parts(self) -> Result<(RoomCode, Vec<u8>, ChunkMeta), ProtocolError> {
        let payload = decode_payload(&self.file_data)?;
        let meta = ChunkMeta {
            file_name: self.file_name.unwrap_or_default(),
            file_type: self.file_type.unwrap_or_default(),
            file_size: self.file_size.unwrap_or_default(),
            chunk_index: self.chunk_index,
            total_chunks: self.total_chunks,
            is_first_chunk: self.is_first_chunk,
            is_last_chunk: self.is_last_chunk,
        };
        Ok((self.room_id, payload, meta))
    }

    /// Decodes just the payload bytes.
    pub fn payload(&self) -> Result<Vec<u8>, ProtocolError> {
        decode_payload(&self.file_data)
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// One protocol message.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON, with the tag
/// in snake_case and every field in camelCase:
///
/// ```text
/// {"type":"create"}
/// {"type":"room_created","roomId":"042917"}
/// {"type":"join","roomId":"042917"}
/// {"type":"error","fileData":"Room not found"}
/// {"type":"participants_count","participants":1}
/// {"type":"file_chunk","roomId":"042917","fileData":"aGVsbG8",...}
/// {"type":"room_closed"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum Envelope {
    /// Peer → server: "open a room with me as host."
    Create,

    /// Server → host: "your room is open under this code."
    RoomCreated { room_id: RoomCode },

    /// Peer → server: "add me to this room as a receiver."
    Join {
        #[serde(default)]
        room_id: RoomCode,
    },

    /// Server → peer: a human-readable failure. Browser peers read the
    /// text from `fileData`.
    Error {
        #[serde(rename = "fileData")]
        message: String,
    },

    /// Server → host: the room's current receiver count.
    ParticipantsCount {
        #[serde(default)]
        participants: usize,
    },

    /// Host → server → receivers: one fragment of a file.
    FileChunk(FileChunk),

    /// Server → receiver: the host left and the room is gone.
    RoomClosed,
}

impl Envelope {
    /// Returns the wire tag, for logging.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::RoomCreated { .. } => "room_created",
            Self::Join { .. } => "join",
            Self::Error { .. } => "error",
            Self::ParticipantsCount { .. } => "participants_count",
            Self::FileChunk(_) => "file_chunk",
            Self::RoomClosed => "room_closed",
        }
    }

    /// Builds an `error` envelope.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
