//! Memory-mapped file stream: writes are copies into a pre-allocated map.

use crate::error::{StreamError, StreamResult};
use crate::options::MappedOptions;
use crate::stream::{OpenStream, OutputStream, StreamState};
use memmap2::{MmapMut, MmapOptions};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// A file stream that writes by copying into a memory-mapped region.
///
/// At open the file is resized to a fixed capacity and mapped in full.
/// Writes are bounds-checked copies into the map; nothing reaches the file
/// through a write system call.
///
/// # Positions
///
/// - `write_pos`: offset of the next write
/// - `sync_pos`: offset up to which the map has been synced to the file,
///   always `<= write_pos`
/// - `end_of_data`: high-water mark of valid data, never lowered by a write
///   earlier in the region, always `<= capacity`
///
/// # Durability
///
/// `sync()` flushes `[sync_pos, write_pos)` of the map with `msync`. Until
/// `close` (or `truncate`) trims the file, a crash can leave it at its full
/// pre-allocated capacity with unwritten trailing bytes past `end_of_data`.
///
/// # Example
///
/// ```no_run
/// use binlog_stream::{MappedFileStream, MappedOptions, OpenStream, OutputStream};
/// use std::path::Path;
///
/// let mut stream = MappedFileStream::new();
/// stream.open(Path::new("binlog.000001"), &MappedOptions::with_capacity(4096)).unwrap();
/// stream.write(b"event bytes").unwrap();
/// stream.sync().unwrap();
/// stream.close().unwrap(); // file is trimmed to 11 bytes
/// ```
#[derive(Debug)]
pub struct MappedFileStream {
    path: Option<PathBuf>,
    file: Option<File>,
    map: Option<MmapMut>,
    capacity: u64,
    /// Physical file size as last set by this stream.
    file_len: u64,
    write_pos: u64,
    sync_pos: u64,
    end_of_data: u64,
    state: StreamState,
}

impl MappedFileStream {
    /// Creates an unopened stream.
    #[must_use]
    pub fn new() -> Self {
        Self {
            path: None,
            file: None,
            map: None,
            capacity: 0,
            file_len: 0,
            write_pos: 0,
            sync_pos: 0,
            end_of_data: 0,
            state: StreamState::Unopened,
        }
    }

    /// Creates a stream and opens it on `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created, resized or mapped.
    pub fn create(path: &Path, options: &MappedOptions) -> StreamResult<Self> {
        let mut stream = Self::new();
        stream.open(path, options)?;
        Ok(stream)
    }

    /// Returns the path of the backing file, once opened.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the fixed capacity of the mapped region.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Returns the offset of the next write.
    #[must_use]
    pub fn write_pos(&self) -> u64 {
        self.write_pos
    }

    /// Returns the offset up to which the region has been synced.
    #[must_use]
    pub fn sync_pos(&self) -> u64 {
        self.sync_pos
    }

    /// Returns the logical end of written data.
    #[must_use]
    pub fn end_of_data(&self) -> u64 {
        self.end_of_data
    }

    /// Returns the number of bytes that can still be written at `write_pos`.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.capacity - self.write_pos
    }

    fn map_mut(&mut self) -> StreamResult<&mut MmapMut> {
        self.map
            .as_mut()
            .ok_or_else(|| StreamError::invariant("open stream has no mapping"))
    }

    fn file_ref(&self) -> StreamResult<&File> {
        self.file
            .as_ref()
            .ok_or_else(|| StreamError::invariant("open stream has no file handle"))
    }

    /// Makes sure the file backs the map up to `end`.
    ///
    /// After a truncate the file can be shorter than the map; touching a page
    /// past end-of-file would fault, so the file is grown back to capacity.
    fn ensure_backed(&mut self, end: u64) -> StreamResult<()> {
        if end <= self.file_len {
            return Ok(());
        }
        self.file_ref()?.set_len(self.capacity)?;
        debug!(
            from = self.file_len,
            to = self.capacity,
            "re-extended mapped file after truncate"
        );
        self.file_len = self.capacity;
        Ok(())
    }
}

impl Default for MappedFileStream {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps the first `len` bytes of `file` for writing.
#[allow(unsafe_code)]
fn map_file(file: &File, len: usize) -> io::Result<MmapMut> {
    // SAFETY: the file is owned exclusively by the stream and was resized to
    // `len` before mapping. The stream only shrinks it through `truncate`,
    // and never touches mapped bytes past the current file size.
    unsafe { MmapOptions::new().len(len).map_mut(file) }
}

impl OpenStream for MappedFileStream {
    type Options = MappedOptions;

    fn open(&mut self, path: &Path, options: &MappedOptions) -> StreamResult<()> {
        if self.state != StreamState::Unopened {
            return Err(StreamError::AlreadyOpened);
        }
        if options.capacity == 0 {
            return Err(StreamError::invalid_input("mapped capacity must be non-zero"));
        }
        let len = usize::try_from(options.capacity).map_err(|_| {
            StreamError::invalid_input(format!(
                "mapped capacity {} exceeds the address space",
                options.capacity
            ))
        })?;

        if options.create_dirs {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        // On any failure below `file` is dropped and the descriptor released.
        file.set_len(options.capacity)?;
        let map = map_file(&file, len)?;

        debug!(path = %path.display(), capacity = options.capacity, "opened mapped stream");

        self.path = Some(path.to_path_buf());
        self.file = Some(file);
        self.map = Some(map);
        self.capacity = options.capacity;
        self.file_len = options.capacity;
        self.write_pos = 0;
        self.sync_pos = 0;
        self.end_of_data = 0;
        self.state = StreamState::Open;
        Ok(())
    }
}

impl OutputStream for MappedFileStream {
    fn write(&mut self, data: &[u8]) -> StreamResult<()> {
        self.state.ensure_open()?;

        if data.is_empty() {
            return Ok(());
        }

        let end = self
            .write_pos
            .checked_add(data.len() as u64)
            .filter(|&end| end <= self.capacity)
            .ok_or(StreamError::CapacityViolation {
                offset: self.write_pos,
                len: data.len(),
                capacity: self.capacity,
            })?;

        self.ensure_backed(end)?;

        // Both bounds are <= capacity, which fits in usize.
        let start = self.write_pos as usize;
        let map = self.map_mut()?;
        map[start..start + data.len()].copy_from_slice(data);

        self.write_pos = end;
        if end > self.end_of_data {
            self.end_of_data = end;
        }
        Ok(())
    }

    fn seek(&mut self, offset: u64) -> StreamResult<()> {
        self.state.ensure_open()?;

        if offset > self.capacity {
            return Err(StreamError::CapacityViolation {
                offset,
                len: 0,
                capacity: self.capacity,
            });
        }

        self.write_pos = offset;
        self.sync_pos = offset;
        if offset > self.end_of_data {
            self.end_of_data = offset;
        }
        Ok(())
    }

    fn truncate(&mut self, offset: u64) -> StreamResult<()> {
        self.state.ensure_open()?;

        if offset > self.capacity {
            return Err(StreamError::CapacityViolation {
                offset,
                len: 0,
                capacity: self.capacity,
            });
        }

        self.file_ref()?.set_len(offset)?;
        self.file_len = offset;

        if offset < self.end_of_data {
            self.end_of_data = offset;
        }
        if self.write_pos > offset {
            self.write_pos = offset;
            self.sync_pos = offset;
        }

        debug!(offset, end_of_data = self.end_of_data, "truncated mapped stream");
        Ok(())
    }

    fn flush(&mut self) -> StreamResult<()> {
        // Writes land in the shared mapping, which the OS already sees.
        self.state.ensure_open()
    }

    fn sync(&mut self) -> StreamResult<()> {
        self.state.ensure_open()?;

        if self.sync_pos == self.write_pos {
            return Ok(());
        }

        let start = self.sync_pos as usize;
        let len = (self.write_pos - self.sync_pos) as usize;
        trace!(start, len, "syncing mapped range");
        self.map_mut()?.flush_range(start, len)?;

        self.sync_pos = self.write_pos;
        Ok(())
    }

    fn close(&mut self) -> StreamResult<()> {
        if self.state != StreamState::Open {
            return Ok(());
        }

        let mut first_error: Option<StreamError> = None;

        if self.sync_pos != self.write_pos {
            first_error = Some(StreamError::invariant(format!(
                "close with unsynced bytes: sync_pos {} != write_pos {}",
                self.sync_pos, self.write_pos
            )));
        } else if self.end_of_data < self.write_pos {
            first_error = Some(StreamError::invariant(format!(
                "end_of_data {} behind write_pos {}",
                self.end_of_data, self.write_pos
            )));
        }

        // Unmap before trimming the file underneath the mapping.
        drop(self.map.take());

        if let Some(file) = self.file.take() {
            if let Err(e) = file.set_len(self.end_of_data) {
                first_error.get_or_insert(StreamError::Io(e));
            }
        }

        self.state = StreamState::Closed;
        debug!(
            path = ?self.path,
            end_of_data = self.end_of_data,
            ok = first_error.is_none(),
            "closed mapped stream"
        );

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn position(&self) -> u64 {
        self.write_pos
    }

    fn state(&self) -> StreamState {
        self.state
    }
}

impl Drop for MappedFileStream {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(path = ?self.path, error = %e, "failed to close mapped stream on drop");
        }
    }
}
