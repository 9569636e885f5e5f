//! Network error types for serialization and protocol operations.

use std::io;
use thiserror::Error;

/// Errors that can occur while reading or writing frames.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The underlying stream failed.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// Failed to encode a message
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    /// The frame was read but isn't a known message
    #[error("failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),

    /// A line ran past the maximum frame size without a delimiter
    #[error("frame exceeds maximum size of {max} bytes")]
    FrameTooLarge { max: usize },
}

impl CodecError {
    /// Whether the connection can't be read from anymore. Decode failures
    /// only spoil the one frame.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Decode(_))
    }
}

/// Result type for serialization operations
pub type Result<T> = std::result::Result<T, CodecError>;
