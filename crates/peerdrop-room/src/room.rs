//! A single room: one host, its receivers, and the transfer in progress.
//!
//! The host handle is fixed at creation and read without locking. The
//! receiver set and transfer metadata sit behind the room's own mutex,
//! which is never taken while the registry lock is held.

use std::collections::HashMap;
use std::sync::Arc;

use peerdrop_protocol::{ChunkMeta, RoomCode};
use peerdrop_transport::{Connection, ConnectionId};
use tokio::sync::{Mutex, MutexGuard};

/// Metadata for the file currently streaming through a room.
///
/// Started by a first chunk and replaced by the next one. Sizes and counts
/// are the host's declarations, never checked against what was relayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub file_name: String,
    pub file_type: String,
    pub file_size: u64,
    pub total_chunks: u64,
    /// Index of the most recent chunk seen.
    pub last_chunk_index: u64,
    /// Chunks forwarded since the transfer started.
    pub chunks_relayed: u64,
    /// Payload bytes forwarded since the transfer started.
    pub bytes_relayed: u64,
}

impl Transfer {
    /// Starts a transfer from a first chunk's metadata.
    pub fn start(meta: &ChunkMeta) -> Self {
        Self {
            file_name: meta.file_name.clone(),
            file_type: meta.file_type.clone(),
            file_size: meta.file_size,
            total_chunks: meta.total_chunks,
            last_chunk_index: 0,
            chunks_relayed: 0,
            bytes_relayed: 0,
        }
    }

    /// Records one chunk passing through.
    pub fn record(&mut self, meta: &ChunkMeta, payload_len: usize) {
        self.total_chunks = meta.total_chunks;
        self.last_chunk_index = meta.chunk_index;
        self.chunks_relayed += 1;
        self.bytes_relayed += payload_len as u64;
    }
}

/// State guarded by the room lock.
struct RoomInner<C> {
    clients: HashMap<ConnectionId, Arc<C>>,
    transfer: Option<Transfer>,
    /// Set once the host has left. A closed room accepts nothing.
    closed: bool,
}

/// One active transfer session.
pub struct Room<C: Connection> {
    code: RoomCode,
    host: Arc<C>,
    inner: Mutex<RoomInner<C>>,
    /// Held from reading the receiver count until the host has been sent
    /// it, so the host's latest `participants_count` is always current.
    notify: Mutex<()>,
}

impl<C: Connection> Room<C> {
    pub(crate) fn new(code: RoomCode, host: Arc<C>) -> Self {
        Self {
            code,
            host,
            inner: Mutex::new(RoomInner {
                clients: HashMap::new(),
                transfer: None,
                closed: false,
            }),
            notify: Mutex::new(()),
        }
    }

    /// Returns the room's code.
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Returns the host's connection.
    pub fn host(&self) -> &Arc<C> {
        &self.host
    }

    /// Returns `true` if `id` is this room's host.
    pub fn is_host(&self, id: ConnectionId) -> bool {
        self.host.id() == id
    }

    /// Number of joined receivers (the host is not counted).
    pub async fn client_count(&self) -> usize {
        self.inner.lock().await.clients.len()
    }

    /// The transfer in progress, if any.
    pub async fn transfer(&self) -> Option<Transfer> {
        self.inner.lock().await.transfer.clone()
    }

    /// Returns `true` once the host has left.
    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.closed
    }

    /// Orders count notifications to the host.
    pub(crate) async fn lock_notify(&self) -> MutexGuard<'_, ()> {
        self.notify.lock().await
    }

    /// Receiver count, or `None` once the room is closed.
    pub(crate) async fn open_count(&self) -> Option<usize> {
        let inner = self.inner.lock().await;
        (!inner.closed).then_some(inner.clients.len())
    }

    /// Adds a receiver. Re-adding the same connection keeps one entry.
    ///
    /// Returns the new receiver count, or `None` if the room is closed.
    pub(crate) async fn add_client(&self, client: Arc<C>) -> Option<usize> {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return None;
        }
        inner.clients.insert(client.id(), client);
        Some(inner.clients.len())
    }

    /// Removes a receiver.
    ///
    /// Returns the new receiver count if `id` was a member, `None` if it
    /// was not (or the room is closed).
    pub(crate) async fn remove_client(&self, id: ConnectionId) -> Option<usize> {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return None;
        }
        inner.clients.remove(&id).map(|_| inner.clients.len())
    }

    /// Removes every listed receiver still present.
    ///
    /// Returns the evicted handles.
    pub(crate) async fn evict(&self, ids: &[ConnectionId]) -> Vec<Arc<C>> {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return Vec::new();
        }
        ids.iter()
            .filter_map(|id| inner.clients.remove(id))
            .collect()
    }

    /// Applies a chunk to the transfer metadata and snapshots the receivers.
    ///
    /// A first chunk discards any previous transfer. Returns the
    /// receivers to forward to, or `None` if the room is closed.
    pub(crate) async fn begin_relay(
        &self,
        meta: &ChunkMeta,
        payload_len: usize,
    ) -> Option<(Vec<Arc<C>>, Option<Transfer>)> {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return None;
        }
        if meta.is_first_chunk {
            inner.transfer = Some(Transfer::start(meta));
        }
        if let Some(transfer) = inner.transfer.as_mut() {
            transfer.record(meta, payload_len);
        }
        let snapshot = inner.clients.values().cloned().collect();
        Some((snapshot, inner.transfer.clone()))
    }

    /// Marks the room closed and takes every receiver out of it.
    ///
    /// Returns the receivers that were still joined. Calling this twice
    /// returns an empty list the second time.
    pub(crate) async fn close(&self) -> Vec<Arc<C>> {
        let mut inner = self.inner.lock().await;
        inner.closed = true;
        inner.transfer = None;
        inner.clients.drain().map(|(_, conn)| conn).collect()
    }
}
