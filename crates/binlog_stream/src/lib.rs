//! # binlog_stream
//!
//! Output streams for binary log files.
//!
//! This crate provides the lowest-level write path of the log. Streams are
//! **opaque byte sinks** - they do not interpret the bytes they move. The
//! log-writing layer above decides what to write; a stream only decides how
//! the bytes reach the backing file.
//!
//! ## Design Principles
//!
//! - One contract ([`OutputStream`]) for every write strategy
//! - Single writer: callers serialize access, streams take `&mut self`
//! - `flush` makes bytes visible to the OS, only `sync` makes them durable
//! - Failures are reported, never retried internally
//!
//! ## Available Streams
//!
//! - [`BufferedFileStream`] - Page-cache writes batched through a fixed-size cache
//! - [`MappedFileStream`] - Direct copies into a pre-allocated memory map
//! - [`CompressedStream`] - Routes bytes through a borrowed [`Compressor`]
//! - [`MemoryStream`] - In-memory stream for tests and ephemeral logs
//!
//! ## Example
//!
//! ```rust
//! use binlog_stream::{MemoryStream, OutputStream};
//!
//! let mut stream = MemoryStream::new();
//! stream.write(b"hello world").unwrap();
//! stream.truncate(5).unwrap();
//! stream.write(b"!").unwrap();
//! assert_eq!(stream.data(), b"hello!");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod buffered;
mod compressed;
mod compressor;
mod error;
mod mapped;
mod memory;
mod options;
mod stream;

pub use buffered::BufferedFileStream;
pub use compressed::CompressedStream;
pub use compressor::{CompressOutcome, Compressor, NoneCompressor};
pub use error::{StreamError, StreamResult};
pub use mapped::MappedFileStream;
pub use memory::MemoryStream;
pub use options::{BufferedOptions, MappedOptions, DEFAULT_CACHE_SIZE, DEFAULT_MAPPED_CAPACITY};
pub use stream::{OpenStream, OutputStream, StreamState};
