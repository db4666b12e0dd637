//! Codec trait and implementations for serializing/deserializing envelopes.
//!
//! The session layer doesn't care how envelopes become frames; it only
//! needs something that implements [`Codec`]. Outbound frames are text
//! because browser peers hand them straight to `JSON.parse`.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// A codec that turns values into text frames and inbound frames back into
/// values.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into one text frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes one inbound frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use peerdrop_protocol::{Codec, Envelope, JsonCodec};
///
/// let codec = JsonCodec;
///
/// let text = codec.encode(&Envelope::ParticipantsCount { participants: 2 }).unwrap();
/// assert_eq!(text, r#"{"type":"participants_count","participants":2}"#);
///
/// let decoded: Envelope = codec.decode(br#"{"type":"create"}"#).unwrap();
/// assert_eq!(decoded, Envelope::Create);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
