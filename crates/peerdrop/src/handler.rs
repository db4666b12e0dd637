//! Per-connection session: read loop, dispatch, and cleanup.
//!
//! Each upgraded connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Loop: receive a frame → decode an envelope → dispatch it
//!   2. On close or receive error: reconcile the session's membership once
//!
//! A session belongs to at most one room at a time and remembers its role
//! there, so cleanup never has to search the registry.

use std::sync::Arc;

use peerdrop_protocol::{Codec, Envelope, FileChunk, RoomCode};
use peerdrop_room::{Departure, Membership};
use peerdrop_transport::{Connection, ConnectionId, TransportError};

use crate::server::ServerState;
use crate::ServerError;

/// One peer's place in the relay.
///
/// If the handler unwinds before [`Session::finish`] runs, `Drop` still
/// reconciles the membership. Since `Drop` is synchronous, it spawns a
/// fire-and-forget task for the async cleanup.
struct Session<C: Connection, K: Codec> {
    conn: Arc<C>,
    state: Arc<ServerState<C, K>>,
    membership: Option<Membership>,
}

impl<C: Connection, K: Codec> Drop for Session<C, K> {
    fn drop(&mut self) {
        let Some(membership) = self.membership.take() else {
            return;
        };
        let conn_id = self.conn.id();
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.rooms.disconnect(conn_id, Some(&membership)).await;
        });
    }
}

impl<C, K> Session<C, K>
where
    C: Connection<Error = TransportError>,
    K: Codec,
{
    fn id(&self) -> ConnectionId {
        self.conn.id()
    }

    async fn dispatch(&mut self, envelope: Envelope) {
        match envelope {
            Envelope::Create => self.create().await,
            Envelope::Join { room_id } => self.join(room_id).await,
            Envelope::FileChunk(chunk) => self.relay(chunk).await,
            other => {
                tracing::debug!(
                    conn_id = %self.id(),
                    tag = other.tag(),
                    "ignoring server-to-client message from peer"
                );
            }
        }
    }

    /// Opens a new room with this peer as host. Any room the peer was
    /// already in is left first; a previous hosted room is closed.
    async fn create(&mut self) {
        self.leave_current().await;
        let code = self.state.rooms.create(Arc::clone(&self.conn)).await;
        self.membership = Some(Membership::Host(code));
    }

    /// Joins `code` as a receiver.
    ///
    /// An unknown code leaves the current membership untouched; the
    /// registry has already answered with an `error` envelope.
    async fn join(&mut self, code: RoomCode) {
        let switching = self
            .membership
            .as_ref()
            .is_some_and(|current| *current.room() != code);

        if switching && self.state.rooms.lookup(&code).await.is_some() {
            self.leave_current().await;
        }

        match self.state.rooms.join(Arc::clone(&self.conn), &code).await {
            Ok(_) => self.membership = Some(Membership::Client(code)),
            Err(e) => {
                tracing::debug!(conn_id = %self.id(), room = %code, error = %e, "join refused");
            }
        }
    }

    /// Hands a chunk to the relay under the room named in the envelope.
    async fn relay(&mut self, chunk: FileChunk) {
        let (code, payload, meta) = match chunk.into_parts() {
            Ok(parts) => parts,
            Err(e) => {
                tracing::warn!(conn_id = %self.id(), error = %e, "dropping chunk with bad payload");
                return;
            }
        };

        match self
            .state
            .rooms
            .relay_chunk(self.id(), &code, &payload, &meta)
            .await
        {
            Ok(report) => {
                tracing::trace!(
                    conn_id = %self.id(),
                    room = %code,
                    chunk = meta.chunk_index,
                    delivered = report.delivered,
                    "chunk relayed"
                );
            }
            Err(e) => {
                tracing::debug!(conn_id = %self.id(), room = %code, error = %e, "chunk dropped");
            }
        }
    }

    async fn leave_current(&mut self) {
        let Some(membership) = self.membership.take() else {
            return;
        };
        let departure = self
            .state
            .rooms
            .disconnect(self.id(), Some(&membership))
            .await;
        tracing::debug!(conn_id = %self.id(), ?departure, "left previous room");
    }

    /// Reconciles the membership. Consumes the session so it runs once.
    async fn finish(mut self) -> Departure {
        let membership = self.membership.take();
        self.state
            .rooms
            .disconnect(self.id(), membership.as_ref())
            .await
    }
}

/// Serves one connection from upgrade to close.
///
/// Malformed frames are logged and skipped; only the socket ending stops
/// the loop. A receive error (including an oversized frame) is returned
/// after cleanup.
pub(crate) async fn handle_connection<C, K>(
    conn: Arc<C>,
    state: Arc<ServerState<C, K>>,
) -> Result<(), ServerError>
where
    C: Connection<Error = TransportError>,
    K: Codec,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "session started");

    let mut session = Session {
        conn: Arc::clone(&conn),
        state,
        membership: None,
    };

    let ended = loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::debug!(%conn_id, "connection closed cleanly");
                break Ok(());
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break Err(e);
            }
        };

        let envelope: Envelope = match session.state.rooms.codec().decode(&data) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode envelope");
                continue;
            }
        };

        session.dispatch(envelope).await;
    };

    let departure = session.finish().await;
    tracing::debug!(%conn_id, ?departure, "session ended");

    let _ = conn.close().await;
    ended.map_err(ServerError::from)
}
