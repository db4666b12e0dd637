//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! The HTTP upgrade accepts every origin (browser peers are served from
//! anywhere) but only on the configured path. Each upgraded stream is
//! split so that the owning read loop and writers from other peers'
//! tasks lock different halves.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request, Response,
};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::error::{
    CapacityError, Error as WsError, ProtocolError,
};
use tokio_tungstenite::tungstenite::Message;

use crate::{
    Connection, ConnectionId, Incoming, Transport, TransportConfig,
    TransportError,
};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    listener: TcpListener,
    config: TransportConfig,
    shut_down: AtomicBool,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(
        addr: &str,
        config: TransportConfig,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        tracing::info!(addr, path = %config.path, "WebSocket transport listening");
        Ok(Self {
            listener,
            config,
            shut_down: AtomicBool::new(false),
        })
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Incoming = PendingUpgrade;
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Incoming, Self::Error> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(TransportError::Shutdown);
        }

        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::Accept)?;

        Ok(PendingUpgrade {
            stream,
            addr,
            config: self.config.clone(),
        })
    }

    async fn shutdown(&self) -> Result<(), Self::Error> {
        self.shut_down.store(true, Ordering::Release);
        Ok(())
    }
}

/// A TCP stream that has been accepted but not yet upgraded.
pub struct PendingUpgrade {
    stream: TcpStream,
    addr: SocketAddr,
    config: TransportConfig,
}

impl PendingUpgrade {
    /// Returns the remote address of the stream.
    pub fn peer_addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Incoming for PendingUpgrade {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn upgrade(self) -> Result<Self::Connection, Self::Error> {
        let Self {
            stream,
            addr,
            config,
        } = self;

        let path = config.path.clone();
        let check_path =
            move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                if req.uri().path() == path {
                    Ok(resp)
                } else {
                    let mut refused = ErrorResponse::new(Some("not found".into()));
                    *refused.status_mut() = StatusCode::NOT_FOUND;
                    Err(refused)
                }
            };

        let ws_config = WebSocketConfig::default()
            .max_message_size(Some(config.max_message_size))
            .max_frame_size(Some(config.max_message_size));

        let ws = tokio_tungstenite::accept_hdr_async_with_config(
            stream,
            check_path,
            Some(ws_config),
        )
        .await
        .map_err(|e| TransportError::Upgrade(Box::new(e)))?;

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, %addr, "upgraded WebSocket connection");

        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
            closed: AtomicBool::new(false),
        })
    }
}

/// A single upgraded WebSocket connection.
pub struct WebSocketConnection {
    id: ConnectionId,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
    /// Set by our own `close`; later sends fail fast.
    closed: AtomicBool,
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send_text(&self, text: &str) -> Result<(), Self::Error> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::ConnectionClosed(format!(
                "{} was closed by the relay",
                self.id
            )));
        }
        self.sink
            .lock()
            .await
            .send(Message::text(text.to_owned()))
            .await
            .map_err(|e| match e {
                WsError::ConnectionClosed
                | WsError::AlreadyClosed
                | WsError::Protocol(ProtocolError::SendAfterClosing) => {
                    TransportError::ConnectionClosed(format!("{}: {e}", self.id))
                }
                e => TransportError::Send(Box::new(e)),
            })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/raw frame
                Some(Err(WsError::Capacity(CapacityError::MessageTooLong {
                    size,
                    max_size,
                }))) => {
                    return Err(TransportError::MessageTooLarge {
                        size,
                        max: max_size,
                    });
                }
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
                    return Ok(None);
                }
                Some(Err(e)) => return Err(TransportError::Receive(Box::new(e))),
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.closed.store(true, Ordering::Release);
        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| TransportError::Send(Box::new(e)))
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
