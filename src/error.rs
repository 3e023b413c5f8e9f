//! Error types for stream ingest and control handling

use core::fmt;

/// Reasons a stream chunk is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamError {
    /// The chunk does not start with the `DPs` prefix
    BadMagic,
    /// Fewer bytes than the header announces
    Truncated,
    /// Pixel count is zero or above the hardware ceiling
    PixelCount(u16),
    /// Chunk index does not exist for the announced pixel count
    BadPart(u8),
    /// Payload size does not match the chunk's pixel range
    Length { expected: usize, actual: usize },
    /// Running checksum does not match the header
    Checksum { expected: u8, actual: u8 },
    /// Chunk is not the next one of the pending frame
    UnexpectedChunk { expected: Option<u8>, actual: u8 },
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::BadMagic => write!(f, "missing stream prefix"),
            StreamError::Truncated => write!(f, "truncated chunk"),
            StreamError::PixelCount(count) => write!(f, "invalid pixel count {}", count),
            StreamError::BadPart(part) => write!(f, "invalid chunk index {}", part),
            StreamError::Length { expected, actual } => {
                write!(f, "chunk payload is {} bytes, expected {}", actual, expected)
            }
            StreamError::Checksum { expected, actual } => {
                write!(f, "checksum mismatch: got {:#04x}, expected {:#04x}", actual, expected)
            }
            StreamError::UnexpectedChunk { expected, actual } => match expected {
                Some(expected) => write!(f, "chunk {} arrived, expected {}", actual, expected),
                None => write!(f, "chunk {} arrived without a frame start", actual),
            },
        }
    }
}

/// Reasons a control document is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// Payload is not a valid document of the expected shape
    Malformed,
    /// Effect name is not known
    UnknownEffect,
    /// A setting value is out of its supported range
    InvalidSetting,
    /// Topic name does not fit the topic buffers
    TopicTooLong,
    /// Report does not fit the output buffer
    Serialization,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Malformed => write!(f, "malformed control document"),
            CommandError::UnknownEffect => write!(f, "unknown effect"),
            CommandError::InvalidSetting => write!(f, "invalid setting value"),
            CommandError::TopicTooLong => write!(f, "topic name too long"),
            CommandError::Serialization => write!(f, "report does not fit the buffer"),
        }
    }
}
