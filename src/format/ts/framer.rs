use super::types::{SYNC_BYTE, TS_PACKET_SIZE};
use bytes::{Bytes, BytesMut};

/// Reassembles fixed-size TS packets from an arbitrarily chunked byte stream.
///
/// A live source delivers bytes with no alignment guarantee; packets may be
/// split across any number of `push` calls. The framer buffers input,
/// discards garbage until it finds the 0x47 sync byte, and hands out one
/// complete 188-byte packet per `pop`.
#[derive(Debug, Default)]
pub struct PacketFramer {
    buffer: BytesMut,
}

impl PacketFramer {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
        }
    }

    /// Buffers another chunk of the incoming byte stream.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Dequeues one complete, sync-aligned TS packet, or `None` when fewer
    /// than 188 aligned bytes are buffered.
    pub fn pop(&mut self) -> Option<Bytes> {
        // Drop bytes until the buffer starts on a sync byte.
        let sync_at = self.buffer.iter().position(|&b| b == SYNC_BYTE)?;
        if sync_at > 0 {
            log::warn!("framer: skipping {} bytes to resynchronize", sync_at);
            let _ = self.buffer.split_to(sync_at);
        }

        if self.buffer.len() < TS_PACKET_SIZE {
            return None;
        }
        Some(self.buffer.split_to(TS_PACKET_SIZE).freeze())
    }

    /// Number of buffered bytes not yet framed.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}
