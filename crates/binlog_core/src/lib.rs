//! # binlog_core
//!
//! Log-writing layer for binlog files.
//!
//! This crate provides:
//! - [`Config`] selecting the stream strategy once, at configuration time
//! - [`LogWriter`] serializing access to one [`OutputStream`]
//! - [`LogFileHeader`], the fixed-size header reserved at the start of each
//!   file and patched when the file is closed cleanly
//!
//! The writer never interprets the bytes it appends.
//!
//! [`OutputStream`]: binlog_stream::OutputStream

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod header;
mod writer;

pub use config::{Config, StreamKind};
pub use error::{CoreError, CoreResult};
pub use header::{LogFileHeader, LogFileInfo, FLAG_IN_USE, HEADER_SIZE, LOG_MAGIC, LOG_VERSION};
pub use writer::LogWriter;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
