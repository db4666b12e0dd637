//! Disconnect handling.
//!
//! Each connection session remembers which room it belongs to and in what
//! role, so when its socket ends the cleanup is a direct lookup rather
//! than a scan of every room.

use peerdrop_protocol::{Codec, RoomCode};
use peerdrop_transport::{Connection, ConnectionId};

use crate::RoomRegistry;

/// A session's place in a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Membership {
    /// The session created this room.
    Host(RoomCode),
    /// The session joined this room as a receiver.
    Client(RoomCode),
}

impl Membership {
    /// The room this membership refers to.
    pub fn room(&self) -> &RoomCode {
        match self {
            Self::Host(code) | Self::Client(code) => code,
        }
    }
}

/// What the reconciler did for one ended session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Departure {
    /// The session was in no room.
    Unaffiliated,
    /// The host left; the room is gone and this many receivers were closed.
    RoomClosed { room: RoomCode, clients: usize },
    /// A receiver left and the host was told the new count.
    ClientLeft { room: RoomCode },
    /// The membership was already stale (room gone, or already evicted).
    Stale,
}

impl<C: Connection, K: Codec> RoomRegistry<C, K> {
    /// Cleans up after a connection that is going away.
    ///
    /// A departing host closes its room: every receiver gets
    /// `room_closed` and is disconnected, and the code is freed. A
    /// departing receiver is removed and the host gets a fresh
    /// `participants_count`.
    pub async fn disconnect(
        &self,
        conn: ConnectionId,
        membership: Option<&Membership>,
    ) -> Departure {
        match membership {
            None => Departure::Unaffiliated,
            Some(Membership::Host(code)) => match self.close_room(code, conn).await {
                Some(clients) => Departure::RoomClosed {
                    room: code.clone(),
                    clients,
                },
                None => Departure::Stale,
            },
            Some(Membership::Client(code)) => {
                if self.leave(conn, code).await {
                    Departure::ClientLeft { room: code.clone() }
                } else {
                    Departure::Stale
                }
            }
        }
    }
}
