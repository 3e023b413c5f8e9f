//! Wire format of a stream chunk
//!
//! ```text
//! 'D' 'P' 's' | hi | lo | part | chk | R G B ...
//! ```
//!
//! `hi:lo` is the big-endian pixel count of the whole frame, `part` the chunk
//! index and `chk` a running XOR over `hi`, `lo`, `part` and the payload,
//! seeded with `0x55`.

use core::ops::Range;

use crate::color::Rgb;
use crate::error::StreamError;

/// Chunk prefix
pub const STREAM_MAGIC: [u8; 3] = *b"DPs";

/// Prefix, count, part and checksum bytes
pub const HEADER_LEN: usize = 7;

/// Seed of the running checksum
pub const CHECKSUM_SEED: u8 = 0x55;

/// End of the first chunk, in pixels
pub const FIRST_CHUNK: usize = 190;

/// End of the second chunk, in pixels
pub const SECOND_CHUNK: usize = 380;

/// Largest number of pixels one chunk carries
pub const MAX_CHUNK_PIXELS: usize = FIRST_CHUNK;

/// Largest frame the chunk layout can describe
pub const MAX_STREAM_PIXELS: usize = SECOND_CHUNK + MAX_CHUNK_PIXELS;

/// Largest encoded chunk
pub const MAX_CHUNK_LEN: usize = HEADER_LEN + MAX_CHUNK_PIXELS * 3;

const CHUNK_BOUNDARIES: [usize; 4] = [0, FIRST_CHUNK, SECOND_CHUNK, MAX_STREAM_PIXELS];

/// Pixel range carried by chunk `part` of a frame of `pixel_count` pixels
pub fn chunk_range(pixel_count: usize, part: u8) -> Option<Range<usize>> {
    let part = usize::from(part);
    if pixel_count == 0 || pixel_count > MAX_STREAM_PIXELS || part + 1 >= CHUNK_BOUNDARIES.len() {
        return None;
    }
    let start = CHUNK_BOUNDARIES[part];
    if start >= pixel_count {
        return None;
    }
    let end = CHUNK_BOUNDARIES[part + 1].min(pixel_count);
    Some(start..end)
}

/// Number of chunks a frame of `pixel_count` pixels is split into
#[allow(clippy::cast_possible_truncation)]
pub fn chunk_count(pixel_count: usize) -> u8 {
    CHUNK_BOUNDARIES[..CHUNK_BOUNDARIES.len() - 1]
        .iter()
        .filter(|start| **start < pixel_count.min(MAX_STREAM_PIXELS))
        .count() as u8
}

/// Running checksum over the header fields and the payload
pub fn checksum(hi: u8, lo: u8, part: u8, payload: &[u8]) -> u8 {
    payload
        .iter()
        .fold(CHECKSUM_SEED ^ hi ^ lo ^ part, |acc, byte| acc ^ byte)
}

/// One received chunk, borrowed from the transport payload
#[derive(Debug, Clone, Copy)]
pub struct StreamChunk<'a> {
    pub pixel_count: u16,
    pub part: u8,
    pub checksum: u8,
    pub data: &'a [u8],
}

impl<'a> StreamChunk<'a> {
    /// Split a raw chunk into header fields and payload
    ///
    /// Only the framing is checked here; see [`StreamChunk::validate`].
    pub fn parse(bytes: &'a [u8]) -> Result<Self, StreamError> {
        if bytes.len() < HEADER_LEN {
            return Err(if bytes.starts_with(&STREAM_MAGIC[..bytes.len().min(3)]) {
                StreamError::Truncated
            } else {
                StreamError::BadMagic
            });
        }
        if bytes[..3] != STREAM_MAGIC {
            return Err(StreamError::BadMagic);
        }
        Ok(Self {
            pixel_count: u16::from_be_bytes([bytes[3], bytes[4]]),
            part: bytes[5],
            checksum: bytes[6],
            data: &bytes[HEADER_LEN..],
        })
    }

    /// Checksum computed over the received bytes
    pub fn computed_checksum(&self) -> u8 {
        let [hi, lo] = self.pixel_count.to_be_bytes();
        checksum(hi, lo, self.part, self.data)
    }

    /// Pixel range this chunk covers
    pub fn range(&self) -> Result<Range<usize>, StreamError> {
        let count = usize::from(self.pixel_count);
        if count == 0 || count > MAX_STREAM_PIXELS {
            return Err(StreamError::PixelCount(self.pixel_count));
        }
        chunk_range(count, self.part).ok_or(StreamError::BadPart(self.part))
    }

    /// Whether this chunk completes its frame
    pub fn is_last(&self) -> bool {
        self.range()
            .is_ok_and(|range| range.end == usize::from(self.pixel_count))
    }

    /// Check checksum, pixel count, part and payload length
    pub fn validate(&self) -> Result<Range<usize>, StreamError> {
        let actual = self.computed_checksum();
        if actual != self.checksum {
            return Err(StreamError::Checksum {
                expected: self.checksum,
                actual,
            });
        }
        let range = self.range()?;
        let expected = range.len() * 3;
        if self.data.len() != expected {
            return Err(StreamError::Length {
                expected,
                actual: self.data.len(),
            });
        }
        Ok(range)
    }

    /// Iterate the payload as pixels
    pub fn pixels(&self) -> impl Iterator<Item = Rgb> + 'a {
        self.data.chunks_exact(3).map(|rgb| Rgb {
            r: rgb[0],
            g: rgb[1],
            b: rgb[2],
        })
    }
}

/// Encode chunk `part` of `frame` into `out`, returns the encoded length
///
/// This is what a sender (the PC side) produces; used by tools and tests.
pub fn encode_chunk(frame: &[Rgb], part: u8, out: &mut [u8]) -> Result<usize, StreamError> {
    let count = u16::try_from(frame.len()).map_err(|_| StreamError::PixelCount(u16::MAX))?;
    let range = chunk_range(frame.len(), part).ok_or(if frame.is_empty() {
        StreamError::PixelCount(0)
    } else {
        StreamError::BadPart(part)
    })?;
    let len = HEADER_LEN + range.len() * 3;
    if out.len() < len {
        return Err(StreamError::Length {
            expected: len,
            actual: out.len(),
        });
    }

    let [hi, lo] = count.to_be_bytes();
    out[..3].copy_from_slice(&STREAM_MAGIC);
    out[3] = hi;
    out[4] = lo;
    out[5] = part;
    for (bytes, pixel) in out[HEADER_LEN..len].chunks_exact_mut(3).zip(&frame[range]) {
        bytes.copy_from_slice(&[pixel.r, pixel.g, pixel.b]);
    }
    out[6] = checksum(hi, lo, part, &out[HEADER_LEN..len]);
    Ok(len)
}
