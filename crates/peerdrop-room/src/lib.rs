//! Rooms for PeerDrop.
//!
//! A room pairs one host with any number of receivers. The host streams a
//! file in chunks and the relay forwards each chunk to every receiver as
//! it arrives; nothing is stored.
//!
//! # Key types
//!
//! - [`RoomRegistry`] — the code → room table; create, join, relay, close
//! - [`Room`] — one host, its receivers, and the transfer in progress
//! - [`Membership`] — a session's role in a room, used on disconnect
//!
//! # Locking
//!
//! The registry lock is held only to find, insert or remove a room. It is
//! released before the room's own lock is taken, so the two are never
//! nested.

mod error;
mod reconcile;
mod registry;
mod relay;
mod room;

pub use error::RoomError;
pub use reconcile::{Departure, Membership};
pub use registry::{RoomRegistry, OWN_ROOM, ROOM_NOT_FOUND};
pub use relay::RelayReport;
pub use room::{Room, Transfer};
