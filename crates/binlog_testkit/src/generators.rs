//! Property-based test generators using proptest.
//!
//! Provides strategies for payloads and operation sequences, plus a
//! reference model of the memory-mapped stream to check them against.

use binlog_stream::OutputStream;
use binlog_stream::StreamResult;
use proptest::prelude::*;

/// Strategy for generating a single payload (arbitrary bytes).
pub fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..1024)
}

/// Strategy for generating a sequence of small payloads.
pub fn chunks_strategy() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 0..128), 0..32)
}

/// One operation on an output stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOp {
    /// Write the bytes at the current position.
    Write(Vec<u8>),
    /// Reposition the write cursor.
    Seek(u64),
    /// Resize the file and reposition.
    Truncate(u64),
    /// Flush buffered bytes.
    Flush,
    /// Sync flushed bytes.
    Sync,
}

impl StreamOp {
    /// Applies the operation to `stream`.
    ///
    /// # Errors
    ///
    /// Returns whatever the stream returns.
    pub fn apply(&self, stream: &mut dyn OutputStream) -> StreamResult<()> {
        match self {
            Self::Write(data) => stream.write(data),
            Self::Seek(offset) => stream.seek(*offset),
            Self::Truncate(offset) => stream.truncate(*offset),
            Self::Flush => stream.flush(),
            Self::Sync => stream.sync(),
        }
    }

    /// Returns `true` for operations that reposition the cursor.
    pub fn repositions(&self) -> bool {
        matches!(self, Self::Seek(_) | Self::Truncate(_))
    }
}

/// Strategy for generating operation sequences whose offsets stay below
/// `max_offset` (inclusive).
pub fn stream_ops_strategy(max_offset: u64, max_ops: usize) -> impl Strategy<Value = Vec<StreamOp>> {
    let op = prop_oneof![
        4 => prop::collection::vec(any::<u8>(), 0..64).prop_map(StreamOp::Write),
        1 => (0..=max_offset).prop_map(StreamOp::Seek),
        1 => (0..=max_offset).prop_map(StreamOp::Truncate),
        1 => Just(StreamOp::Flush),
        1 => Just(StreamOp::Sync),
    ];
    prop::collection::vec(op, 0..max_ops)
}

/// Reference model of a memory-mapped stream.
///
/// Tracks the same positions as the real stream and the bytes the file will
/// hold once it is synced and closed.
#[derive(Debug, Clone)]
pub struct MappedModel {
    bytes: Vec<u8>,
    capacity: u64,
    file_len: u64,
    /// Next write offset.
    pub write_pos: u64,
    /// Synced offset.
    pub sync_pos: u64,
    /// High-water mark.
    pub end_of_data: u64,
}

impl MappedModel {
    /// Creates a model of a freshly opened stream of `capacity` bytes.
    pub fn new(capacity: u64) -> Self {
        Self {
            bytes: vec![0; capacity as usize],
            capacity,
            file_len: capacity,
            write_pos: 0,
            sync_pos: 0,
            end_of_data: 0,
        }
    }

    /// Applies `op`, returning `false` if the real stream must reject it.
    pub fn apply(&mut self, op: &StreamOp) -> bool {
        match op {
            StreamOp::Write(data) => {
                let end = self.write_pos + data.len() as u64;
                if end > self.capacity {
                    return false;
                }
                if data.is_empty() {
                    return true;
                }
                if end > self.file_len {
                    self.file_len = self.capacity;
                }
                self.bytes[self.write_pos as usize..end as usize].copy_from_slice(data);
                self.write_pos = end;
                self.end_of_data = self.end_of_data.max(end);
            }
            StreamOp::Seek(offset) => {
                if *offset > self.capacity {
                    return false;
                }
                self.write_pos = *offset;
                self.sync_pos = *offset;
                self.end_of_data = self.end_of_data.max(*offset);
            }
            StreamOp::Truncate(offset) => {
                if *offset > self.capacity {
                    return false;
                }
                // Truncation drops the file's pages past the new end.
                self.bytes[*offset as usize..].fill(0);
                self.file_len = *offset;
                self.end_of_data = self.end_of_data.min(*offset);
                if self.write_pos > *offset {
                    self.write_pos = *offset;
                    self.sync_pos = *offset;
                }
            }
            StreamOp::Flush => {}
            StreamOp::Sync => self.sync_pos = self.write_pos,
        }
        true
    }

    /// Bytes the file holds after a final sync and close.
    pub fn final_contents(&self) -> &[u8] {
        &self.bytes[..self.end_of_data as usize]
    }
}
