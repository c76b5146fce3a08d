//! Buffered file stream: writes staged in a fixed-size cache.

use crate::error::{StreamError, StreamResult};
use crate::options::BufferedOptions;
use crate::stream::{OpenStream, OutputStream, StreamState};
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A file stream that batches writes in an in-memory cache.
///
/// Bytes accumulate in a cache of fixed capacity and reach the file handle
/// when the cache fills up or on an explicit [`flush`](OutputStream::flush).
///
/// # Durability
///
/// - `flush()` writes the cache to the OS page cache
/// - `sync()` calls `File::sync_all()` (or `sync_data()`) so flushed bytes
///   survive a power loss; bytes still in the cache are not synced
///
/// # Repositioning
///
/// `seek` and `truncate` abandon whatever is staged in the cache. Callers
/// that need staged bytes persisted must flush first.
///
/// # Example
///
/// ```no_run
/// use binlog_stream::{BufferedFileStream, BufferedOptions, OpenStream, OutputStream};
/// use std::path::Path;
///
/// let mut stream = BufferedFileStream::new();
/// stream.open(Path::new("binlog.000001"), &BufferedOptions::default()).unwrap();
/// stream.write(&[0u8; 16]).unwrap(); // header placeholder
/// stream.write(b"event bytes").unwrap();
/// stream.flush().unwrap();
/// stream.sync().unwrap();
/// stream.close().unwrap();
/// ```
#[derive(Debug)]
pub struct BufferedFileStream {
    path: Option<PathBuf>,
    file: Option<File>,
    cache: Vec<u8>,
    cache_size: usize,
    /// File offset of the first byte in `cache`.
    cache_start: u64,
    data_sync_only: bool,
    state: StreamState,
}

impl BufferedFileStream {
    /// Creates an unopened stream.
    #[must_use]
    pub fn new() -> Self {
        Self {
            path: None,
            file: None,
            cache: Vec::new(),
            cache_size: 0,
            cache_start: 0,
            data_sync_only: false,
            state: StreamState::Unopened,
        }
    }

    /// Creates a stream and opens it on `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the cache cannot be
    /// allocated.
    pub fn create(path: &Path, options: &BufferedOptions) -> StreamResult<Self> {
        let mut stream = Self::new();
        stream.open(path, options)?;
        Ok(stream)
    }

    /// Returns the path of the backing file, once opened.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the capacity of the write cache.
    #[must_use]
    pub fn cache_capacity(&self) -> usize {
        self.cache_size
    }

    /// Returns the number of bytes staged in the cache.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.cache.len()
    }

    fn file_mut(&mut self) -> StreamResult<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| StreamError::invariant("open stream has no file handle"))
    }

    /// Writes `data` at `offset` directly through the file handle.
    fn write_through(&mut self, offset: u64, data: &[u8]) -> StreamResult<()> {
        let file = self.file_mut()?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        Ok(())
    }

    /// Writes the staged cache to the file and empties it.
    ///
    /// On failure the cache is left intact.
    fn drain_cache(&mut self) -> StreamResult<()> {
        if self.cache.is_empty() {
            return Ok(());
        }

        let cache = std::mem::take(&mut self.cache);
        let result = self.write_through(self.cache_start, &cache);
        self.cache = cache;
        result?;

        self.cache_start += self.cache.len() as u64;
        self.cache.clear();
        Ok(())
    }

    /// Drops staged bytes and moves the next write to `offset`.
    fn reposition(&mut self, offset: u64) {
        if !self.cache.is_empty() {
            debug!(
                discarded = self.cache.len(),
                offset, "discarding unflushed cache on reposition"
            );
        }
        self.cache.clear();
        self.cache_start = offset;
    }
}

impl Default for BufferedFileStream {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenStream for BufferedFileStream {
    type Options = BufferedOptions;

    fn open(&mut self, path: &Path, options: &BufferedOptions) -> StreamResult<()> {
        if self.state != StreamState::Unopened {
            return Err(StreamError::AlreadyOpened);
        }
        if options.cache_size == 0 {
            return Err(StreamError::invalid_input("cache size must be non-zero"));
        }

        if options.create_dirs {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(options.truncate_existing)
            .open(path)?;

        // `file` is dropped (and the descriptor released) if this fails.
        let mut cache = Vec::new();
        cache
            .try_reserve_exact(options.cache_size)
            .map_err(|e| io::Error::new(io::ErrorKind::OutOfMemory, e))?;

        debug!(path = %path.display(), cache_size = options.cache_size, "opened buffered stream");

        self.path = Some(path.to_path_buf());
        self.file = Some(file);
        self.cache = cache;
        self.cache_size = options.cache_size;
        self.cache_start = 0;
        self.data_sync_only = options.data_sync_only;
        self.state = StreamState::Open;
        Ok(())
    }
}

impl OutputStream for BufferedFileStream {
    fn write(&mut self, data: &[u8]) -> StreamResult<()> {
        self.state.ensure_open()?;

        if data.is_empty() {
            return Ok(());
        }

        if self.cache.len() + data.len() <= self.cache_size {
            let staged = self.cache.len();
            self.cache.extend_from_slice(data);
            if self.cache.len() == self.cache_size {
                if let Err(e) = self.drain_cache() {
                    // A failed write leaves nothing of `data` behind.
                    self.cache.truncate(staged);
                    return Err(e);
                }
            }
            return Ok(());
        }

        self.drain_cache()?;

        if data.len() >= self.cache_size {
            // Too large to stage; bypass the cache.
            self.write_through(self.cache_start, data)?;
            self.cache_start += data.len() as u64;
        } else {
            self.cache.extend_from_slice(data);
        }

        Ok(())
    }

    fn seek(&mut self, offset: u64) -> StreamResult<()> {
        self.state.ensure_open()?;
        self.reposition(offset);
        Ok(())
    }

    fn truncate(&mut self, offset: u64) -> StreamResult<()> {
        self.state.ensure_open()?;
        self.file_mut()?.set_len(offset)?;
        debug!(offset, "truncated buffered stream");
        self.reposition(offset);
        Ok(())
    }

    fn flush(&mut self) -> StreamResult<()> {
        self.state.ensure_open()?;
        self.drain_cache()?;
        self.file_mut()?.flush()?;
        Ok(())
    }

    fn sync(&mut self) -> StreamResult<()> {
        self.state.ensure_open()?;
        let data_only = self.data_sync_only;
        let file = self.file_mut()?;
        if data_only {
            file.sync_data()?;
        } else {
            file.sync_all()?;
        }
        Ok(())
    }

    fn close(&mut self) -> StreamResult<()> {
        if self.state != StreamState::Open {
            return Ok(());
        }

        let result = self.drain_cache();

        // Dropping the handle releases the descriptor even if the drain failed.
        drop(self.file.take());
        self.cache = Vec::new();
        self.state = StreamState::Closed;

        debug!(path = ?self.path, ok = result.is_ok(), "closed buffered stream");
        result
    }

    fn position(&self) -> u64 {
        self.cache_start + self.cache.len() as u64
    }

    fn state(&self) -> StreamState {
        self.state
    }
}

impl Drop for BufferedFileStream {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(path = ?self.path, error = %e, "failed to close buffered stream on drop");
        }
    }
}
