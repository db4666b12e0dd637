//! Server configuration.

use peerdrop_transport::{TransportConfig, DEFAULT_MAX_MESSAGE_SIZE};

/// Default listen address: every interface, port 8080.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Everything the server needs before it starts listening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to listen on, `host:port`.
    pub bind_addr: String,
    /// HTTP path upgraded to the message socket.
    pub path: String,
    /// Largest inbound message accepted, in bytes.
    pub max_message_size: usize,
}

impl ServerConfig {
    /// The socket settings handed to the transport.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            path: self.path.clone(),
            max_message_size: self.max_message_size,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        let transport = TransportConfig::default();
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            path: transport.path,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}
