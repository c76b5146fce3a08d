//! Error types for stream operations.

use crate::stream::StreamState;
use std::io;
use thiserror::Error;

/// Result type for stream operations.
pub type StreamResult<T> = Result<T, StreamError>;

/// Errors that can occur during stream operations.
#[derive(Debug, Error)]
pub enum StreamError {
    /// An I/O error occurred (open, write, resize, sync or map failure).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A write or reposition would exceed the fixed capacity of a mapped region.
    #[error("capacity exceeded: offset {offset}, len {len}, capacity {capacity}")]
    CapacityViolation {
        /// The offset the operation starts at.
        offset: u64,
        /// The number of bytes requested.
        len: usize,
        /// The fixed capacity of the region.
        capacity: u64,
    },

    /// No compressor is attached, or the compressor rejected the input.
    #[error("compression failed: {message}")]
    Compression {
        /// Description of the failure.
        message: String,
    },

    /// An internal invariant of the stream does not hold.
    #[error("invariant violated: {message}")]
    InvariantViolation {
        /// Description of the violated invariant.
        message: String,
    },

    /// The operation requires an open stream.
    #[error("stream is not open (state: {0})")]
    NotOpen(StreamState),

    /// `open` was called on a stream that has already been opened.
    #[error("stream has already been opened")]
    AlreadyOpened,

    /// The stream does not support the operation.
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),
}

impl StreamError {
    /// Creates a compression error.
    pub fn compression(message: impl Into<String>) -> Self {
        Self::Compression {
            message: message.into(),
        }
    }

    /// Creates an invariant violation error.
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Creates an I/O error of kind `InvalidInput`.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::Io(io::Error::new(io::ErrorKind::InvalidInput, message.into()))
    }
}
