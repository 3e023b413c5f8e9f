//! Streamed pixel frames from the PC
//!
//! Frames arrive split in chunks (see [`chunk`]). Chunks are validated and
//! staged; the frame buffer is only written once the last chunk of a frame
//! passed validation, so a corrupted or missing chunk never shows up on the
//! strip.

pub mod chunk;
pub mod serial;

use embassy_time::{Duration, Instant};
use log::{debug, warn};

pub use chunk::{
    FIRST_CHUNK, MAX_CHUNK_LEN, MAX_STREAM_PIXELS, SECOND_CHUNK, StreamChunk, chunk_count,
    chunk_range, encode_chunk,
};
pub use serial::{SerialDecoder, SerialEvent};

use crate::color::{BLACK, Rgb};
use crate::error::StreamError;
use crate::frame_buffer::FrameBuffer;

/// Result of accepting a valid chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// Chunk staged, more chunks needed
    Partial { part: u8 },
    /// Frame complete and written to the frame buffer
    Committed { pixel_count: usize },
}

/// Totals of one serial read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerialReport {
    pub committed: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, Copy)]
struct PendingFrame {
    pixel_count: u16,
    next_part: u8,
}

/// Stages chunks and commits complete frames
#[derive(Debug, Clone)]
pub struct FrameAssembler<const MAX_LEDS: usize> {
    staging: [Rgb; MAX_LEDS],
    pending: Option<PendingFrame>,
    frames: u32,
    rejected: u32,
    last_activity: Option<Instant>,
}

impl<const MAX_LEDS: usize> Default for FrameAssembler<MAX_LEDS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const MAX_LEDS: usize> FrameAssembler<MAX_LEDS> {
    pub const fn new() -> Self {
        Self {
            staging: [BLACK; MAX_LEDS],
            pending: None,
            frames: 0,
            rejected: 0,
            last_activity: None,
        }
    }

    /// Validate and stage one chunk, committing the frame on its last chunk
    ///
    /// Pixels beyond `MAX_LEDS` are dropped; a larger frame commits its
    /// first `MAX_LEDS` pixels. Any error abandons the pending frame.
    pub fn accept(
        &mut self,
        chunk: &StreamChunk<'_>,
        frame: &mut FrameBuffer<MAX_LEDS>,
        now: Instant,
    ) -> Result<ChunkOutcome, StreamError> {
        let range = match self.stage(chunk) {
            Ok(range) => range,
            Err(err) => {
                self.abandon();
                return Err(err);
            }
        };

        let stored = range.start.min(MAX_LEDS)..range.end.min(MAX_LEDS);
        for (slot, pixel) in self.staging[stored].iter_mut().zip(chunk.pixels()) {
            *slot = pixel;
        }

        if !chunk.is_last() {
            self.pending = Some(PendingFrame {
                pixel_count: chunk.pixel_count,
                next_part: chunk.part + 1,
            });
            return Ok(ChunkOutcome::Partial { part: chunk.part });
        }

        self.pending = None;
        let announced = usize::from(chunk.pixel_count);
        let pixel_count = announced.min(MAX_LEDS);
        if pixel_count < announced {
            debug!("stream frame of {} pixels clamped to {}", announced, pixel_count);
        }
        if frame.active_len() != pixel_count {
            debug!(
                "stream resizes strip from {} to {} pixels",
                frame.active_len(),
                pixel_count
            );
            frame.set_active_len(pixel_count);
        }
        frame
            .active_mut()
            .copy_from_slice(&self.staging[..pixel_count]);
        self.frames = self.frames.wrapping_add(1);
        self.last_activity = Some(now);

        Ok(ChunkOutcome::Committed { pixel_count })
    }

    fn stage(&self, chunk: &StreamChunk<'_>) -> Result<core::ops::Range<usize>, StreamError> {
        let range = chunk.validate()?;
        if chunk.part == 0 {
            return Ok(range);
        }
        match self.pending {
            Some(pending)
                if pending.pixel_count == chunk.pixel_count && pending.next_part == chunk.part =>
            {
                Ok(range)
            }
            pending => Err(StreamError::UnexpectedChunk {
                expected: pending.map(|p| p.next_part),
                actual: chunk.part,
            }),
        }
    }

    /// Drop the pending frame after a rejected chunk
    pub fn abandon(&mut self) {
        self.pending = None;
        self.rejected = self.rejected.wrapping_add(1);
    }

    /// Drop the pending frame and restart the idle clock at `now`
    pub fn reset(&mut self, now: Instant) {
        self.pending = None;
        self.last_activity = Some(now);
    }

    /// Whether a frame is partially assembled
    pub const fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Number of frames committed so far
    pub const fn frames(&self) -> u32 {
        self.frames
    }

    /// Number of chunks rejected so far
    pub const fn rejected(&self) -> u32 {
        self.rejected
    }

    /// Whether nothing was committed for `timeout`
    pub fn is_idle(&self, now: Instant, timeout: Duration) -> bool {
        match self.last_activity {
            Some(last) => now.saturating_duration_since(last) >= timeout,
            None => true,
        }
    }
}

/// Stream ingest for both transports
#[derive(Debug, Clone)]
pub struct StreamIngest<const MAX_LEDS: usize> {
    assembler: FrameAssembler<MAX_LEDS>,
    serial: SerialDecoder,
}

impl<const MAX_LEDS: usize> Default for StreamIngest<MAX_LEDS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const MAX_LEDS: usize> StreamIngest<MAX_LEDS> {
    pub const fn new() -> Self {
        Self {
            assembler: FrameAssembler::new(),
            serial: SerialDecoder::new(),
        }
    }

    pub const fn assembler(&self) -> &FrameAssembler<MAX_LEDS> {
        &self.assembler
    }

    /// Apply one network message carrying exactly one chunk
    pub fn ingest_network(
        &mut self,
        payload: &[u8],
        frame: &mut FrameBuffer<MAX_LEDS>,
        now: Instant,
    ) -> Result<ChunkOutcome, StreamError> {
        match StreamChunk::parse(payload) {
            Ok(chunk) => self.assembler.accept(&chunk, frame, now),
            Err(err) => {
                self.assembler.abandon();
                Err(err)
            }
        }
    }

    /// Feed a fragment of the serial byte stream
    pub fn ingest_serial(
        &mut self,
        bytes: &[u8],
        frame: &mut FrameBuffer<MAX_LEDS>,
        now: Instant,
    ) -> SerialReport {
        let mut report = SerialReport::default();
        for &byte in bytes {
            let result = match self.serial.push(byte) {
                None => continue,
                Some(SerialEvent::HeaderRejected) => {
                    self.assembler.abandon();
                    report.rejected += 1;
                    continue;
                }
                Some(SerialEvent::Chunk(raw)) => match StreamChunk::parse(raw) {
                    Ok(chunk) => self.assembler.accept(&chunk, frame, now),
                    Err(err) => {
                        self.assembler.abandon();
                        Err(err)
                    }
                },
            };
            match result {
                Ok(ChunkOutcome::Committed { .. }) => report.committed += 1,
                Ok(ChunkOutcome::Partial { .. }) => {}
                Err(err) => {
                    warn!("serial chunk dropped: {}", err);
                    report.rejected += 1;
                }
            }
        }
        report
    }

    /// Forget partial chunks and frames, restarting the idle clock
    pub fn reset(&mut self, now: Instant) {
        self.serial.reset();
        self.assembler.reset(now);
    }

    pub const fn frames(&self) -> u32 {
        self.assembler.frames()
    }

    pub fn is_idle(&self, now: Instant, timeout: Duration) -> bool {
        self.assembler.is_idle(now, timeout)
    }
}
