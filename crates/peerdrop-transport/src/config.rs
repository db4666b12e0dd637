//! Upgrade and framing limits for the message socket.

/// Default inbound size ceiling: 1 MiB per frame and per message.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Settings applied to every upgraded socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// The HTTP path that may be upgraded. Requests for any other path are
    /// refused with 404.
    pub path: String,

    /// Largest inbound frame or message accepted, in bytes. Anything
    /// larger is rejected before it reaches the envelope decoder.
    pub max_message_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            path: "/ws".to_string(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}
