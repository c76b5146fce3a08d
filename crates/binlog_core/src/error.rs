//! Error types for the log-writing layer.

use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in log writer operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Output stream error.
    #[error("stream error: {0}")]
    Stream(#[from] binlog_stream::StreamError),

    /// I/O error outside a stream (e.g. reading a header back).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid log file format or version.
    #[error("invalid log format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },

    /// The writer has been closed.
    #[error("log writer is closed")]
    WriterClosed,
}

impl CoreError {
    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }
}
