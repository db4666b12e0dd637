//! Chunk relay: forwards a host's file chunks to every receiver.
//!
//! Delivery is best-effort and at-most-once per chunk per receiver. There
//! is no buffering, reassembly or retry. A receiver whose socket rejects a
//! chunk is evicted on the spot, the same as if it had disconnected.

use peerdrop_protocol::{ChunkMeta, Codec, Envelope, FileChunk, RoomCode};
use peerdrop_transport::{Connection, ConnectionId};

use crate::{RoomError, RoomRegistry};

/// What happened to one relayed chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayReport {
    /// Receivers that were sent the chunk.
    pub delivered: usize,
    /// Receivers dropped because the send failed.
    pub evicted: Vec<ConnectionId>,
}

impl<C: Connection, K: Codec> RoomRegistry<C, K> {
    /// Relays one chunk from `host` to every receiver in `code`.
    ///
    /// The chunk is encoded once and written to each receiver in turn, so
    /// receivers see a host's chunks in the order the host sent them. A
    /// first chunk resets the room's transfer metadata.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`] — no active room has this code
    /// - [`RoomError::NotHost`] — `host` is not the room's host
    /// - [`RoomError::Closed`] — the room closed mid-call
    ///
    /// Callers drop these silently: the sender gets no reply.
    pub async fn relay_chunk(
        &self,
        host: ConnectionId,
        code: &RoomCode,
        payload: &[u8],
        meta: &ChunkMeta,
    ) -> Result<RelayReport, RoomError> {
        let room = self
            .lookup(code)
            .await
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        if !room.is_host(host) {
            return Err(RoomError::NotHost(code.clone()));
        }

        let (receivers, transfer) = room
            .begin_relay(meta, payload.len())
            .await
            .ok_or_else(|| RoomError::Closed(code.clone()))?;

        if meta.is_first_chunk {
            tracing::info!(
                room = %code,
                file = %meta.file_name,
                file_type = %meta.file_type,
                size = meta.file_size,
                total_chunks = meta.total_chunks,
                "transfer started"
            );
        }

        let text = self
            .codec
            .encode(&Envelope::FileChunk(FileChunk::relayed(code, payload, meta)))?;

        let mut report = RelayReport::default();
        let mut failed = Vec::new();
        for receiver in &receivers {
            match self.send_text(receiver.as_ref(), &text).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        room = %code,
                        client = %receiver.id(),
                        error = %e,
                        "chunk not delivered, evicting client"
                    );
                    failed.push(receiver.id());
                }
            }
        }

        if !failed.is_empty() {
            let evicted = room.evict(&failed).await;
            for conn in &evicted {
                let _ = conn.close().await;
                report.evicted.push(conn.id());
            }
            if !evicted.is_empty() {
                self.notify_count(&room).await;
            }
        }

        if meta.is_last_chunk {
            if let Some(transfer) = transfer {
                tracing::info!(
                    room = %code,
                    file = %transfer.file_name,
                    chunks = transfer.chunks_relayed,
                    bytes = transfer.bytes_relayed,
                    declared_chunks = transfer.total_chunks,
                    "transfer completed"
                );
            }
        }

        Ok(report)
    }
}
