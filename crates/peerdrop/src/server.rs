//! `PeerdropServer` builder and accept loop.
//!
//! This is the entry point for running a relay. It ties the layers
//! together: transport → protocol → room.

use std::future::Future;
use std::sync::Arc;

use peerdrop_protocol::{Codec, JsonCodec};
use peerdrop_room::RoomRegistry;
use peerdrop_transport::{
    Connection, Incoming, Transport, WebSocketConnection, WebSocketTransport,
};

use crate::handler::handle_connection;
use crate::{ServerConfig, ServerError};

/// Shared server state passed to each connection task.
pub(crate) struct ServerState<C: Connection, K: Codec> {
    pub(crate) rooms: RoomRegistry<C, K>,
}

/// Builder for configuring and starting a PeerDrop server.
///
/// # Example
///
/// ```rust,no_run
/// use peerdrop::PeerdropServerBuilder;
///
/// # async fn start() -> Result<(), peerdrop::ServerError> {
/// let server = PeerdropServerBuilder::new()
///     .bind("127.0.0.1:9000")
///     .path("/ws")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct PeerdropServerBuilder {
    config: ServerConfig,
}

impl PeerdropServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Replaces every setting at once.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the HTTP path that is upgraded to a message socket.
    pub fn path(mut self, path: &str) -> Self {
        self.config.path = path.to_string();
        self
    }

    /// Sets the largest inbound message accepted, in bytes.
    pub fn max_message_size(mut self, bytes: usize) -> Self {
        self.config.max_message_size = bytes;
        self
    }

    /// Binds the listener.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<PeerdropServer, ServerError> {
        let transport =
            WebSocketTransport::bind(&self.config.bind_addr, self.config.transport()).await?;

        let state = Arc::new(ServerState {
            rooms: RoomRegistry::with_codec(JsonCodec),
        });

        Ok(PeerdropServer { transport, state })
    }
}

impl Default for PeerdropServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound PeerDrop relay.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct PeerdropServer {
    transport: WebSocketTransport,
    state: Arc<ServerState<WebSocketConnection, JsonCodec>>,
}

impl PeerdropServer {
    /// Creates a new builder.
    pub fn builder() -> PeerdropServerBuilder {
        PeerdropServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs until `signal` resolves, then stops accepting.
    ///
    /// Sessions already running are left to finish on their own tasks.
    pub async fn run_until(
        self,
        signal: impl Future<Output = ()>,
    ) -> Result<(), ServerError> {
        tokio::select! {
            result = self.run() => result,
            () = signal => {
                tracing::info!("shutdown signal received, no longer accepting");
                Ok(())
            }
        }
    }

    /// Runs the accept loop.
    ///
    /// Each accepted stream is upgraded and then served on its own task,
    /// so neither a slow handshake nor a busy peer holds up the loop.
    /// Accept failures are logged and the loop carries on. Runs until the
    /// process is terminated.
    pub async fn run(mut self) -> Result<(), ServerError> {
        tracing::info!("PeerDrop relay running");

        loop {
            match self.transport.accept().await {
                Ok(incoming) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        let addr = incoming.peer_addr();
                        let conn = match incoming.upgrade().await {
                            Ok(conn) => conn,
                            Err(e) => {
                                tracing::debug!(%addr, error = %e, "upgrade refused");
                                return;
                            }
                        };
                        if let Err(e) = handle_connection(Arc::new(conn), state).await {
                            tracing::debug!(%addr, error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
