//! Base64 handling for chunk payloads.
//!
//! Chunk bytes cross the wire as base64 text inside `fileData`. Browsers
//! are not consistent about the alphabet, so decoding accepts both the
//! standard (`+`, `/`) and URL-safe (`-`, `_`) alphabets, with or without
//! `=` padding. Encoding always produces URL-safe text without padding so
//! every receiver sees one format.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE_NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;

use crate::ProtocolError;

/// Standard alphabet, padding optional, trailing bits not checked.
const TOLERANT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Encodes raw chunk bytes for an outbound envelope.
pub fn encode_payload(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decodes a chunk payload written in either base64 alphabet.
///
/// URL-safe characters are mapped onto the standard alphabet first, then
/// the text is decoded with padding optional.
///
/// # Errors
/// Returns [`ProtocolError::InvalidPayload`] if the text is not base64.
pub fn decode_payload(text: &str) -> Result<Vec<u8>, ProtocolError> {
    let normalized: String = text
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    TOLERANT
        .decode(normalized.as_bytes())
        .map_err(ProtocolError::InvalidPayload)
}
