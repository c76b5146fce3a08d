//! Output stream trait definition.

use crate::error::{StreamError, StreamResult};
use std::fmt;
use std::path::Path;

/// Lifecycle state of a stream.
///
/// Every stream starts `Unopened`, becomes `Open` exactly once and ends
/// `Closed`. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamState {
    /// Constructed but not yet opened.
    Unopened,
    /// Accepting writes.
    Open,
    /// Finalized; the backing file has been released.
    Closed,
}

impl StreamState {
    /// Returns `Ok(())` if the state is `Open`, `NotOpen` otherwise.
    pub fn ensure_open(self) -> StreamResult<()> {
        match self {
            Self::Open => Ok(()),
            other => Err(StreamError::NotOpen(other)),
        }
    }
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unopened => "unopened",
            Self::Open => "open",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// An append-oriented output stream for a log file.
///
/// Streams are **opaque byte sinks**. The log writer upstream decides what
/// bytes to write; a stream moves them to the backing store under its own
/// I/O strategy. The writer holds a `Box<dyn OutputStream>` chosen once at
/// configuration time.
///
/// # Invariants
///
/// - `write` appends at [`position`](Self::position) and advances it by the
///   length written; zero-length writes succeed without effect
/// - `flush` makes written bytes visible to the OS, not durable
/// - `sync` makes flushed bytes durable; a second `sync` with no write in
///   between is a no-op
/// - `close` always runs every finalization step, even after a failure
/// - Every operation except `close` requires the stream to be open
///
/// Streams are single-writer: no internal locking is performed.
///
/// # Implementors
///
/// - [`super::BufferedFileStream`] - Cached writes through a file handle
/// - [`super::MappedFileStream`] - Direct copies into a memory map
/// - [`super::CompressedStream`] - Forwards bytes to a compressor
/// - [`super::MemoryStream`] - For testing
pub trait OutputStream: Send {
    /// Appends `data` at the current logical position.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The stream is not open
    /// - The write would exceed a fixed-capacity region
    /// - An I/O error occurs
    fn write(&mut self, data: &[u8]) -> StreamResult<()>;

    /// Repositions the logical write cursor to `offset`.
    ///
    /// Bytes that were written but not yet flushed may be discarded by a
    /// seek; callers that need them must `flush` (and for mapped streams
    /// `sync`) first.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is not open or the offset is invalid.
    fn seek(&mut self, offset: u64) -> StreamResult<()>;

    /// Resizes the backing file to exactly `offset` bytes and positions the
    /// next write at or before `offset`.
    ///
    /// Used to rewrite a previously reserved region once its final value is
    /// known.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is not open or the resize fails.
    fn truncate(&mut self, offset: u64) -> StreamResult<()>;

    /// Pushes buffered bytes to the OS.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is not open or the write fails.
    fn flush(&mut self) -> StreamResult<()>;

    /// Forces previously flushed bytes to stable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is not open or the sync fails.
    fn sync(&mut self) -> StreamResult<()>;

    /// Flushes, finalizes the physical size and releases the backing file.
    ///
    /// The stream is `Closed` afterwards, whether or not an error is
    /// returned. Closing a stream that is not open is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the first error met while finalizing.
    fn close(&mut self) -> StreamResult<()>;

    /// Returns the current logical write position.
    fn position(&self) -> u64;

    /// Returns the lifecycle state.
    fn state(&self) -> StreamState;

    /// Returns `true` if the stream accepts writes.
    fn is_open(&self) -> bool {
        self.state() == StreamState::Open
    }
}

/// A stream that is opened on a file path with implementation-specific
/// options.
///
/// Kept apart from [`OutputStream`] so the latter stays object safe.
pub trait OpenStream: OutputStream {
    /// Options accepted by [`open`](Self::open).
    type Options;

    /// Creates or opens the backing file and allocates internal buffers.
    ///
    /// On failure no partial state is left behind: the stream stays
    /// `Unopened` and any file handle created is released.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream was already opened or the file cannot
    /// be created, resized or mapped.
    fn open(&mut self, path: &Path, options: &Self::Options) -> StreamResult<()>;
}

impl<S: OutputStream + ?Sized> OutputStream for Box<S> {
    fn write(&mut self, data: &[u8]) -> StreamResult<()> {
        (**self).write(data)
    }

    fn seek(&mut self, offset: u64) -> StreamResult<()> {
        (**self).seek(offset)
    }

    fn truncate(&mut self, offset: u64) -> StreamResult<()> {
        (**self).truncate(offset)
    }

    fn flush(&mut self) -> StreamResult<()> {
        (**self).flush()
    }

    fn sync(&mut self) -> StreamResult<()> {
        (**self).sync()
    }

    fn close(&mut self) -> StreamResult<()> {
        (**self).close()
    }

    fn position(&self) -> u64 {
        (**self).position()
    }

    fn state(&self) -> StreamState {
        (**self).state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_open_only_accepts_open() {
        assert!(StreamState::Open.ensure_open().is_ok());
        assert!(matches!(
            StreamState::Unopened.ensure_open(),
            Err(StreamError::NotOpen(StreamState::Unopened))
        ));
        assert!(matches!(
            StreamState::Closed.ensure_open(),
            Err(StreamError::NotOpen(StreamState::Closed))
        ));
    }

    #[test]
    fn state_display() {
        assert_eq!(StreamState::Unopened.to_string(), "unopened");
        assert_eq!(StreamState::Open.to_string(), "open");
        assert_eq!(StreamState::Closed.to_string(), "closed");
    }
}
