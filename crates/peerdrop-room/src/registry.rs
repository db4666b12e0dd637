//! The room registry: every active room, keyed by code.
//!
//! One `RoomRegistry` is owned by the server and shared by reference with
//! every connection task. Its lock only guards the code → room map and is
//! always released before a room's own lock is taken.

use std::collections::HashMap;
use std::sync::Arc;

use peerdrop_protocol::{Codec, Envelope, JsonCodec, RoomCode};
use peerdrop_transport::{Connection, ConnectionId};
use tokio::sync::Mutex;

use crate::{Room, RoomError};

/// Error text sent to a peer that joins an unknown room.
pub const ROOM_NOT_FOUND: &str = "Room not found";

/// Error text sent to a host that tries to join its own room.
pub const OWN_ROOM: &str = "You are already hosting this room";

/// All active rooms.
pub struct RoomRegistry<C: Connection, K: Codec = JsonCodec> {
    rooms: Mutex<HashMap<RoomCode, Arc<Room<C>>>>,
    pub(crate) codec: K,
}

impl<C: Connection> RoomRegistry<C, JsonCodec> {
    /// Creates an empty registry speaking JSON.
    pub fn new() -> Self {
        Self::with_codec(JsonCodec)
    }
}

impl<C: Connection> Default for RoomRegistry<C, JsonCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connection, K: Codec> RoomRegistry<C, K> {
    /// Creates an empty registry using the given codec for outbound
    /// envelopes.
    pub fn with_codec(codec: K) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            codec,
        }
    }

    /// The codec used for every envelope this registry sends.
    pub fn codec(&self) -> &K {
        &self.codec
    }

    /// Opens a room hosted by `host` and tells the host its code.
    ///
    /// Codes are redrawn until one is free, all under the registry lock,
    /// so two rooms never share a code. A failed `room_created` send is
    /// only logged: the host's own read loop will notice the dead socket
    /// and tear the room down.
    pub async fn create(&self, host: Arc<C>) -> RoomCode {
        let code = {
            let mut rooms = self.rooms.lock().await;
            let code = loop {
                let candidate = RoomCode::generate();
                if !rooms.contains_key(&candidate) {
                    break candidate;
                }
            };
            let room = Arc::new(Room::new(code.clone(), Arc::clone(&host)));
            rooms.insert(code.clone(), room);
            code
        };

        tracing::info!(room = %code, host = %host.id(), "room created");

        let created = Envelope::RoomCreated {
            room_id: code.clone(),
        };
        if let Err(e) = self.send(host.as_ref(), &created).await {
            tracing::warn!(room = %code, error = %e, "failed to confirm room to host");
        }
        code
    }

    /// Looks up an active room.
    pub async fn lookup(&self, code: &RoomCode) -> Option<Arc<Room<C>>> {
        self.rooms.lock().await.get(code).cloned()
    }

    /// Removes a room, but only if `host` is its host.
    ///
    /// Returns the removed room. Once this returns, no lookup can find it.
    pub async fn remove_if_host(
        &self,
        code: &RoomCode,
        host: ConnectionId,
    ) -> Option<Arc<Room<C>>> {
        let mut rooms = self.rooms.lock().await;
        match rooms.get(code) {
            Some(room) if room.is_host(host) => rooms.remove(code),
            _ => None,
        }
    }

    /// Adds `client` to a room as a receiver and tells the host the new
    /// receiver count.
    ///
    /// An unknown code is answered with an `error` envelope; the client
    /// stays connected and may try another code. Joining twice keeps one
    /// membership but still sends the host a fresh count.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`] — no active room has this code
    /// - [`RoomError::OwnRoom`] — `client` is the room's host
    pub async fn join(
        &self,
        client: Arc<C>,
        code: &RoomCode,
    ) -> Result<usize, RoomError> {
        let Some(room) = self.lookup(code).await else {
            self.reply_error(client.as_ref(), ROOM_NOT_FOUND).await;
            return Err(RoomError::NotFound(code.clone()));
        };

        if room.is_host(client.id()) {
            self.reply_error(client.as_ref(), OWN_ROOM).await;
            return Err(RoomError::OwnRoom(code.clone()));
        }

        let client_id = client.id();
        let Some(count) = room.add_client(Arc::clone(&client)).await else {
            // Closed between lookup and lock: same as never having existed.
            self.reply_error(client.as_ref(), ROOM_NOT_FOUND).await;
            return Err(RoomError::NotFound(code.clone()));
        };

        tracing::info!(room = %code, client = %client_id, participants = count, "client joined");
        self.notify_count(&room).await;
        Ok(count)
    }

    /// Removes `client` from a room's receivers and tells the host.
    ///
    /// Returns `false` (and notifies no one) if the room is gone or the
    /// client was not a member.
    pub async fn leave(&self, client: ConnectionId, code: &RoomCode) -> bool {
        let Some(room) = self.lookup(code).await else {
            return false;
        };
        let Some(count) = room.remove_client(client).await else {
            return false;
        };

        tracing::info!(room = %code, %client, participants = count, "client left");
        self.notify_count(&room).await;
        true
    }

    /// Tears down a room because its host left.
    ///
    /// The room leaves the registry first, so its code is immediately
    /// free. Every receiver still joined then gets `room_closed` and has
    /// its socket closed. Returns how many receivers were dropped, or
    /// `None` if `host` does not host a room under `code`.
    pub async fn close_room(
        &self,
        code: &RoomCode,
        host: ConnectionId,
    ) -> Option<usize> {
        let room = self.remove_if_host(code, host).await?;
        let clients = room.close().await;

        tracing::info!(room = %code, %host, clients = clients.len(), "host left, room closed");

        for client in &clients {
            if let Err(e) = self.send(client.as_ref(), &Envelope::RoomClosed).await {
                tracing::debug!(room = %code, client = %client.id(), error = %e, "room_closed not delivered");
            }
            let _ = client.close().await;
        }
        Some(clients.len())
    }

    /// Number of active rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    /// Number of receivers in a room, or `None` if it doesn't exist.
    pub async fn participant_count(&self, code: &RoomCode) -> Option<usize> {
        let room = self.lookup(code).await?;
        Some(room.client_count().await)
    }

    /// Sends the host a `participants_count` envelope with the current
    /// receiver count.
    ///
    /// The count is read and sent under the room's notify lock, so
    /// concurrent joins and leaves reach the host in the order they were
    /// counted. A closed room sends nothing.
    pub(crate) async fn notify_count(&self, room: &Room<C>) {
        let _order = room.lock_notify().await;
        let Some(count) = room.open_count().await else {
            return;
        };
        let update = Envelope::ParticipantsCount {
            participants: count,
        };
        if let Err(e) = self.send(room.host().as_ref(), &update).await {
            tracing::debug!(room = %room.code(), error = %e, "participants_count not delivered");
        }
    }

    async fn reply_error(&self, conn: &C, message: &str) {
        if let Err(e) = self.send(conn, &Envelope::error(message)).await {
            tracing::debug!(conn = %conn.id(), error = %e, "error envelope not delivered");
        }
    }

    /// Encodes and sends one envelope.
    pub(crate) async fn send(
        &self,
        conn: &C,
        envelope: &Envelope,
    ) -> Result<(), RoomError> {
        let text = self.codec.encode(envelope)?;
        self.send_text(conn, &text).await
    }

    pub(crate) async fn send_text(&self, conn: &C, text: &str) -> Result<(), RoomError> {
        conn.send_text(text)
            .await
            .map_err(|e| RoomError::Transport(Box::new(e)))
    }
}
