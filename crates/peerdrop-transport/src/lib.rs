//! Transport abstraction layer for PeerDrop.
//!
//! Provides the [`Transport`], [`Incoming`] and [`Connection`] traits that
//! hide how a browser peer's message socket is obtained. The relay only
//! ever sees whole text messages going out and whole frames coming in.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — HTTP upgrade to WebSocket via `tokio-tungstenite`

mod config;
mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use config::{TransportConfig, DEFAULT_MAX_MESSAGE_SIZE};
pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{PendingUpgrade, WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::future::Future;

/// Opaque identifier for a connection.
///
/// Two handles are the same peer if and only if their ids are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming sockets.
///
/// `accept` only waits for the raw stream; the protocol upgrade happens in
/// [`Incoming::upgrade`] so a slow handshake never stalls the accept loop.
pub trait Transport: Send + Sync + 'static {
    /// A raw inbound stream that still has to be upgraded.
    type Incoming: Incoming<Connection = Self::Connection, Error = Self::Error>;
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Waits for the next inbound stream.
    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<Self::Incoming, Self::Error>> + Send;

    /// Gracefully shuts down the transport, stopping new connections.
    fn shutdown(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// An accepted stream waiting for its protocol upgrade.
pub trait Incoming: Send + 'static {
    /// The connection produced by a successful upgrade.
    type Connection: Connection;
    /// The error type for a failed upgrade.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Performs the upgrade handshake.
    fn upgrade(
        self,
    ) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send;
}

/// A single full-duplex message socket.
///
/// Implementations must allow `send_text` to make progress while another
/// task is parked in `recv`: a peer's read loop is always blocked in
/// `recv` while other peers' tasks write to it.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Sends one text message to the remote peer.
    fn send_text(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Receives the next message from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send;

    /// Closes the connection.
    fn close(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
