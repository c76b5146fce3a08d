//! CLI command implementations.

pub mod inspect;
pub mod write;

use thiserror::Error;

/// Errors raised by the commands themselves, as opposed to the log layer.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The requested output format is not known.
    #[error("unknown output format '{0}' (expected text or json)")]
    UnknownFormat(String),

    /// An argument is out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
