//! In-memory output stream for testing.

use crate::error::{StreamError, StreamResult};
use std::io;
use crate::stream::{OutputStream, StreamState};

/// An in-memory output stream.
///
/// This stream keeps all bytes in a `Vec<u8>` and is suitable for:
/// - Unit tests of the log-writing layer
/// - Ephemeral logs that don't need persistence
///
/// It is open from construction. `seek` and `truncate` follow the buffered
/// file semantics: the next write starts exactly at the given offset.
///
/// # Example
///
/// ```rust
/// use binlog_stream::{MemoryStream, OutputStream};
///
/// let mut stream = MemoryStream::new();
/// stream.write(b"test data").unwrap();
/// assert_eq!(stream.position(), 9);
/// assert_eq!(stream.data(), b"test data");
/// ```
#[derive(Debug)]
pub struct MemoryStream {
    data: Vec<u8>,
    position: u64,
    flush_count: usize,
    sync_count: usize,
    state: StreamState,
}

impl MemoryStream {
    /// Creates a new empty, open stream.
    #[must_use]
    pub fn new() -> Self {
        Self::with_data(Vec::new())
    }

    /// Creates a stream over pre-existing bytes, positioned at offset 0.
    ///
    /// Useful for testing header rewrites.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data,
            position: 0,
            flush_count: 0,
            sync_count: 0,
            state: StreamState::Open,
        }
    }

    /// Returns the stored bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the stream and returns the stored bytes.
    #[must_use]
    pub fn into_data(mut self) -> Vec<u8> {
        std::mem::take(&mut self.data)
    }

    /// Returns how many times `flush` succeeded.
    #[must_use]
    pub fn flush_count(&self) -> usize {
        self.flush_count
    }

    /// Returns how many times `sync` succeeded.
    #[must_use]
    pub fn sync_count(&self) -> usize {
        self.sync_count
    }
}

impl MemoryStream {
    /// Zero-extends the buffer to at least `len` bytes.
    fn grow_to(&mut self, len: usize) -> StreamResult<()> {
        if self.data.len() < len {
            self.data
                .try_reserve(len - self.data.len())
                .map_err(|e| io::Error::new(io::ErrorKind::OutOfMemory, e))?;
            self.data.resize(len, 0);
        }
        Ok(())
    }
}

fn to_index(offset: u64) -> StreamResult<usize> {
    usize::try_from(offset).map_err(|_| {
        StreamError::invalid_input(format!("offset {offset} exceeds the address space"))
    })
}

impl Default for MemoryStream {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputStream for MemoryStream {
    fn write(&mut self, bytes: &[u8]) -> StreamResult<()> {
        self.state.ensure_open()?;

        if bytes.is_empty() {
            return Ok(());
        }

        let start = to_index(self.position)?;
        let end = start.checked_add(bytes.len()).ok_or_else(|| {
            StreamError::invalid_input(format!(
                "write of {} bytes at {start} overflows the address space",
                bytes.len()
            ))
        })?;
        self.grow_to(end)?;
        self.data[start..end].copy_from_slice(bytes);
        self.position = end as u64;
        Ok(())
    }

    fn seek(&mut self, offset: u64) -> StreamResult<()> {
        self.state.ensure_open()?;
        self.position = offset;
        Ok(())
    }

    fn truncate(&mut self, offset: u64) -> StreamResult<()> {
        self.state.ensure_open()?;
        let len = to_index(offset)?;
        self.grow_to(len)?;
        self.data.truncate(len);
        self.position = offset;
        Ok(())
    }

    fn flush(&mut self) -> StreamResult<()> {
        self.state.ensure_open()?;
        self.flush_count += 1;
        Ok(())
    }

    fn sync(&mut self) -> StreamResult<()> {
        self.state.ensure_open()?;
        self.sync_count += 1;
        Ok(())
    }

    fn close(&mut self) -> StreamResult<()> {
        self.state = StreamState::Closed;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn state(&self) -> StreamState {
        self.state
    }
}
