//! Byte-oriented chunk framing for the serial link
//!
//! Serial reads deliver arbitrary fragments. The decoder hunts for the
//! prefix, reads the header to learn the payload size and hands out a
//! complete chunk once all of its bytes arrived. Garbage between chunks is
//! skipped. A header that cannot describe a chunk is reported and its bytes
//! after the first are searched again for a prefix.

use heapless::Vec;
use log::warn;

use super::chunk::{HEADER_LEN, MAX_CHUNK_LEN, STREAM_MAGIC, chunk_range};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    /// Number of prefix bytes matched so far
    Magic(usize),
    Header,
    Payload { len: usize },
    Complete,
}

/// What a byte completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialEvent<'a> {
    /// Raw bytes of a complete chunk
    Chunk(&'a [u8]),
    /// A prefix followed by an impossible pixel count or part
    HeaderRejected,
}

/// Reassembles chunks from a serial byte stream
#[derive(Debug, Clone)]
pub struct SerialDecoder {
    buffer: Vec<u8, MAX_CHUNK_LEN>,
    state: DecoderState,
}

impl Default for SerialDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialDecoder {
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            state: DecoderState::Magic(0),
        }
    }

    /// Drop any partially received chunk and wait for the next prefix
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = DecoderState::Magic(0);
    }

    /// Whether a chunk is partially received
    pub fn in_progress(&self) -> bool {
        !matches!(self.state, DecoderState::Magic(0) | DecoderState::Complete)
    }

    /// Feed one byte, returns the raw chunk when it completes
    ///
    /// The returned bytes stay valid until the next call.
    pub fn push(&mut self, byte: u8) -> Option<SerialEvent<'_>> {
        if self.state == DecoderState::Complete {
            self.reset();
        }

        match self.state {
            DecoderState::Magic(matched) => {
                if byte == STREAM_MAGIC[matched] {
                    self.store(byte);
                    self.state = if matched + 1 == STREAM_MAGIC.len() {
                        DecoderState::Header
                    } else {
                        DecoderState::Magic(matched + 1)
                    };
                } else {
                    self.reset();
                    if byte == STREAM_MAGIC[0] {
                        self.store(byte);
                        self.state = DecoderState::Magic(1);
                    }
                }
                None
            }
            DecoderState::Header => {
                self.store(byte);
                if self.buffer.len() < HEADER_LEN {
                    return None;
                }
                let count = usize::from(u16::from_be_bytes([self.buffer[3], self.buffer[4]]));
                let part = self.buffer[5];
                let Some(range) = chunk_range(count, part) else {
                    warn!("serial chunk header rejected: {} pixels, part {}", count, part);
                    self.rescan();
                    return Some(SerialEvent::HeaderRejected);
                };
                self.state = DecoderState::Payload {
                    len: HEADER_LEN + range.len() * 3,
                };
                self.complete_if_full()
            }
            DecoderState::Payload { .. } => {
                self.store(byte);
                self.complete_if_full()
            }
            DecoderState::Complete => None,
        }
    }

    /// Restart the prefix hunt on the header bytes after the first
    fn rescan(&mut self) {
        let mut header = [0u8; HEADER_LEN];
        header.copy_from_slice(&self.buffer[..HEADER_LEN]);
        self.reset();
        // Fewer than HEADER_LEN bytes never finish a header
        for &byte in &header[1..] {
            let _ = self.push(byte);
        }
    }

    fn complete_if_full(&mut self) -> Option<SerialEvent<'_>> {
        let DecoderState::Payload { len } = self.state else {
            return None;
        };
        if self.buffer.len() < len {
            return None;
        }
        self.state = DecoderState::Complete;
        Some(SerialEvent::Chunk(&self.buffer))
    }

    fn store(&mut self, byte: u8) {
        if self.buffer.push(byte).is_err() {
            // Header validation bounds every chunk, so this only guards resync
            self.reset();
        }
    }
}
