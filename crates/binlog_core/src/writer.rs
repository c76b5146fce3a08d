//! Log writer.

use crate::config::{Config, StreamKind};
use crate::error::{CoreError, CoreResult};
use crate::header::{LogFileHeader, HEADER_SIZE};
use binlog_stream::{BufferedFileStream, MappedFileStream, OutputStream};
use parking_lot::Mutex;
use std::path::Path;
use tracing::{debug, info, warn};

/// Writer state guarded by the writer lock.
struct Inner {
    stream: Box<dyn OutputStream>,
    /// Logical end of the last commit.
    committed_len: u64,
    closed: bool,
}

impl Inner {
    fn ensure_open(&self) -> CoreResult<()> {
        if self.closed {
            Err(CoreError::WriterClosed)
        } else {
            Ok(())
        }
    }

    /// Flushes and syncs so every written byte is in the file.
    fn settle(&mut self) -> CoreResult<()> {
        self.stream.flush()?;
        self.stream.sync()?;
        Ok(())
    }

    /// Rewrites `[offset, offset + bytes.len())` and returns to the end.
    fn overwrite(&mut self, offset: u64, bytes: &[u8]) -> CoreResult<()> {
        self.settle()?;
        let end = self.stream.position();

        self.stream.seek(offset)?;
        self.stream.write(bytes)?;
        self.settle()?;
        self.stream.seek(end)?;
        Ok(())
    }

    /// Truncates to `offset` after syncing what lies before it.
    ///
    /// A mapped stream forgets unsynced bytes below `offset` when it
    /// rewinds its sync position, so they are synced first.
    fn truncate_to(&mut self, offset: u64) -> CoreResult<()> {
        self.stream.sync()?;
        self.stream.truncate(offset)?;
        self.committed_len = self.committed_len.min(offset);
        Ok(())
    }
}

/// Appends opaque bytes to a log file through one output stream.
///
/// The `LogWriter` owns the stream chosen at configuration time and
/// serializes all access to it behind a lock, so it can be shared across
/// threads. It reserves a [`LogFileHeader`] at the start of the file and
/// patches it on [`close`](Self::close).
///
/// # Commit and Rollback
///
/// Appended bytes become part of the log at [`commit`](Self::commit), which
/// flushes them (and syncs, if configured). A failed append rolls the file
/// back to the last commit point, so a partially written group of bytes is
/// never left behind.
pub struct LogWriter {
    inner: Mutex<Inner>,
    sync_on_commit: bool,
}

impl LogWriter {
    /// Creates a new log file at `path` with the configured stream.
    ///
    /// An existing file at `path` is replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream cannot be opened or the header cannot
    /// be written.
    pub fn create(path: &Path, config: &Config) -> CoreResult<Self> {
        let stream: Box<dyn OutputStream> = match config.stream {
            StreamKind::Buffered => Box::new(BufferedFileStream::create(
                path,
                &config.buffered_options(),
            )?),
            StreamKind::Mapped { capacity } => Box::new(MappedFileStream::create(
                path,
                &config.mapped_options(capacity),
            )?),
        };

        info!(path = %path.display(), stream = ?config.stream, "created log file");
        Self::with_stream(stream, config)
    }

    /// Creates a writer over an already open stream positioned at 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is not open, not at offset 0, or the
    /// header cannot be written.
    pub fn with_stream(mut stream: Box<dyn OutputStream>, config: &Config) -> CoreResult<Self> {
        stream.state().ensure_open()?;
        if stream.position() != 0 {
            return Err(CoreError::invalid_operation(format!(
                "log stream must start at offset 0, found {}",
                stream.position()
            )));
        }

        stream.write(&LogFileHeader::in_use().encode())?;

        let writer = Self {
            inner: Mutex::new(Inner {
                stream,
                committed_len: 0,
                closed: false,
            }),
            sync_on_commit: config.sync_on_commit,
        };
        writer.commit()?;
        Ok(writer)
    }

    /// Appends `data` to the log.
    ///
    /// Returns the offset where the data starts.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer is closed or the stream write fails.
    /// After a failed write the log is truncated to the last commit point,
    /// discarding every uncommitted append.
    pub fn append(&self, data: &[u8]) -> CoreResult<u64> {
        let mut inner = self.inner.lock();
        inner.ensure_open()?;

        let offset = inner.stream.position();
        if let Err(e) = inner.stream.write(data) {
            let committed = inner.committed_len;
            warn!(offset, committed, error = %e, "append failed, rolling back to last commit");
            if let Err(rollback) = inner.truncate_to(committed) {
                warn!(error = %rollback, "rollback after failed append also failed");
            }
            return Err(e.into());
        }

        Ok(offset)
    }

    /// Makes every appended byte part of the log.
    ///
    /// Flushes the stream, and syncs it when `sync_on_commit` is set.
    /// Returns the committed length.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer is closed or the flush/sync fails.
    pub fn commit(&self) -> CoreResult<u64> {
        let mut inner = self.inner.lock();
        inner.ensure_open()?;

        inner.stream.flush()?;
        if self.sync_on_commit {
            inner.stream.sync()?;
        }

        inner.committed_len = inner.stream.position();
        Ok(inner.committed_len)
    }

    /// Discards everything appended since the last commit.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer is closed or the truncate fails.
    pub fn rollback(&self) -> CoreResult<()> {
        let mut inner = self.inner.lock();
        inner.ensure_open()?;

        let committed = inner.committed_len;
        debug!(committed, "rolling back to last commit");
        inner.truncate_to(committed)
    }

    /// Truncates the log to `offset`, which must lie after the header.
    ///
    /// The commit point moves back with it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer is closed, `offset` falls inside the
    /// header, or the truncate fails.
    pub fn truncate(&self, offset: u64) -> CoreResult<()> {
        if offset < HEADER_SIZE as u64 {
            return Err(CoreError::invalid_operation(format!(
                "cannot truncate into the header (offset {offset})"
            )));
        }

        let mut inner = self.inner.lock();
        inner.ensure_open()?;
        inner.truncate_to(offset)
    }

    /// Rewrites already written bytes at `offset`.
    ///
    /// Used to fill in a value reserved earlier, e.g. a length known only
    /// once the bytes after it were appended. The region must lie between
    /// the header and the current end of the log. Everything written so far
    /// is flushed and synced first.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer is closed, the region is out of range,
    /// or the stream cannot reposition.
    pub fn patch(&self, offset: u64, bytes: &[u8]) -> CoreResult<()> {
        let mut inner = self.inner.lock();
        inner.ensure_open()?;

        let end = offset.checked_add(bytes.len() as u64);
        let position = inner.stream.position();
        match end {
            Some(end) if offset >= HEADER_SIZE as u64 && end <= position => {}
            _ => {
                return Err(CoreError::invalid_operation(format!(
                    "patch of {} bytes at {offset} outside [{HEADER_SIZE}, {position})",
                    bytes.len()
                )));
            }
        }

        inner.overwrite(offset, bytes)
    }

    /// Returns the offset where the next append starts.
    pub fn position(&self) -> u64 {
        self.inner.lock().stream.position()
    }

    /// Returns the logical end of the last commit.
    pub fn committed_len(&self) -> u64 {
        self.inner.lock().committed_len
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Commits, finalizes the header and closes the stream.
    ///
    /// Every step is attempted even if an earlier one fails; the first error
    /// is returned. Uncommitted appends are committed by close.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer is already closed or any step fails.
    pub fn close(&self) -> CoreResult<()> {
        let mut inner = self.inner.lock();
        inner.ensure_open()?;
        inner.closed = true;

        let mut first_error: Option<CoreError> = None;

        match inner.settle() {
            Ok(()) => inner.committed_len = inner.stream.position(),
            Err(e) => {
                first_error = Some(e);
            }
        }

        let header = LogFileHeader::finalized(inner.committed_len);
        if let Err(e) = inner.overwrite(0, &header.encode()) {
            first_error.get_or_insert(e);
        }

        if let Err(e) = inner.stream.close() {
            first_error.get_or_insert(e.into());
        }

        info!(
            committed_len = inner.committed_len,
            ok = first_error.is_none(),
            "closed log file"
        );

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for LogWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogWriter")
            .field("sync_on_commit", &self.sync_on_commit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::LogFileInfo;
    use binlog_stream::{MappedOptions, MemoryStream, StreamError, StreamResult, StreamState};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    /// Memory stream whose writes fail while `fail_writes` is set.
    struct FailingStream {
        inner: MemoryStream,
        fail_writes: Arc<AtomicBool>,
    }

    impl OutputStream for FailingStream {
        fn write(&mut self, data: &[u8]) -> StreamResult<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StreamError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "simulated write failure",
                )));
            }
            self.inner.write(data)
        }

        fn seek(&mut self, offset: u64) -> StreamResult<()> {
            self.inner.seek(offset)
        }

        fn truncate(&mut self, offset: u64) -> StreamResult<()> {
            self.inner.truncate(offset)
        }

        fn flush(&mut self) -> StreamResult<()> {
            self.inner.flush()
        }

        fn sync(&mut self) -> StreamResult<()> {
            self.inner.sync()
        }

        fn close(&mut self) -> StreamResult<()> {
            self.inner.close()
        }

        fn position(&self) -> u64 {
            self.inner.position()
        }

        fn state(&self) -> StreamState {
            self.inner.state()
        }
    }

    fn memory_writer() -> LogWriter {
        LogWriter::with_stream(Box::new(MemoryStream::new()), &Config::default()).unwrap()
    }

    #[test]
    fn header_is_reserved_on_create() {
        let writer = memory_writer();
        assert_eq!(writer.position(), HEADER_SIZE as u64);
        assert_eq!(writer.committed_len(), HEADER_SIZE as u64);
    }

    #[test]
    fn append_returns_offsets() {
        let writer = memory_writer();
        assert_eq!(writer.append(b"first").unwrap(), 16);
        assert_eq!(writer.append(b"second").unwrap(), 21);
        assert_eq!(writer.position(), 27);
        assert_eq!(writer.committed_len(), 16);

        assert_eq!(writer.commit().unwrap(), 27);
    }

    #[test]
    fn rollback_discards_uncommitted() {
        let writer = memory_writer();
        writer.append(b"kept").unwrap();
        writer.commit().unwrap();
        writer.append(b"dropped").unwrap();

        writer.rollback().unwrap();
        assert_eq!(writer.position(), 20);
        assert_eq!(writer.append(b"next").unwrap(), 20);
    }

    #[test]
    fn failed_append_rolls_back_to_commit() {
        let fail_writes = Arc::new(AtomicBool::new(false));
        let stream = FailingStream {
            inner: MemoryStream::new(),
            fail_writes: Arc::clone(&fail_writes),
        };
        let writer = LogWriter::with_stream(Box::new(stream), &Config::default()).unwrap();
        writer.append(b"committed").unwrap();
        writer.commit().unwrap();
        writer.append(b"pending").unwrap();
        assert_eq!(writer.position(), 32);

        fail_writes.store(true, Ordering::SeqCst);
        assert!(matches!(
            writer.append(b"lost"),
            Err(CoreError::Stream(StreamError::Io(_)))
        ));
        assert_eq!(writer.position(), 25);
        assert_eq!(writer.committed_len(), 25);

        fail_writes.store(false, Ordering::SeqCst);
        assert_eq!(writer.append(b"retry").unwrap(), 25);
    }

    #[test]
    fn patch_rewrites_reserved_region() {
        let writer = memory_writer();
        let slot = writer.append(&[0u8; 4]).unwrap();
        writer.append(b"payload").unwrap();

        writer.patch(slot, &7u32.to_le_bytes()).unwrap();
        assert_eq!(writer.position(), slot + 4 + 7);
        assert_eq!(writer.append(b"!").unwrap(), slot + 11);
    }

    #[test]
    fn patch_outside_written_region_fails() {
        let writer = memory_writer();
        writer.append(b"abc").unwrap();

        assert!(matches!(
            writer.patch(0, b"hdr"),
            Err(CoreError::InvalidOperation { .. })
        ));
        assert!(matches!(
            writer.patch(17, b"abc"),
            Err(CoreError::InvalidOperation { .. })
        ));
        assert!(writer.patch(16, b"xyz").is_ok());
    }

    #[test]
    fn truncate_into_header_fails() {
        let writer = memory_writer();
        assert!(writer.truncate(8).is_err());
        writer.append(b"abcdef").unwrap();
        writer.commit().unwrap();
        writer.truncate(18).unwrap();
        assert_eq!(writer.position(), 18);
        assert_eq!(writer.committed_len(), 18);
    }

    #[test]
    fn closed_writer_rejects_operations() {
        let writer = memory_writer();
        writer.close().unwrap();
        assert!(writer.is_closed());
        assert!(matches!(writer.append(b"x"), Err(CoreError::WriterClosed)));
        assert!(matches!(writer.commit(), Err(CoreError::WriterClosed)));
        assert!(matches!(writer.close(), Err(CoreError::WriterClosed)));
    }

    #[test]
    fn with_stream_requires_offset_zero() {
        let mut stream = MemoryStream::new();
        stream.write(b"junk").unwrap();
        assert!(matches!(
            LogWriter::with_stream(Box::new(stream), &Config::default()),
            Err(CoreError::InvalidOperation { .. })
        ));
    }

    #[test]
    fn buffered_log_file_lifecycle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("binlog.000001");

        let writer = LogWriter::create(&path, &Config::new().buffered()).unwrap();
        writer.append(b"event-1").unwrap();
        writer.append(b"event-2").unwrap();
        writer.commit().unwrap();

        let info = LogFileInfo::read_from(&path).unwrap();
        assert!(!info.is_clean());

        writer.close().unwrap();

        let info = LogFileInfo::read_from(&path).unwrap();
        assert!(info.is_clean());
        assert_eq!(info.header.committed_len, 30);
        assert_eq!(info.trailing_bytes(), Some(0));

        let contents = std::fs::read(&path).unwrap();
        assert_eq!(&contents[16..], b"event-1event-2");
    }

    #[test]
    fn mapped_log_file_lifecycle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("binlog.000001");

        let writer = LogWriter::create(&path, &Config::new().mapped(64 * 1024)).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 64 * 1024);

        let slot = writer.append(&[0u8; 8]).unwrap();
        writer.append(b"row").unwrap();
        writer.patch(slot, &3u64.to_le_bytes()).unwrap();
        writer.commit().unwrap();
        writer.close().unwrap();

        let contents = std::fs::read(&path).unwrap();
        assert_eq!(contents.len(), 16 + 8 + 3);
        assert_eq!(&contents[16..24], &3u64.to_le_bytes());
        assert_eq!(&contents[24..], b"row");

        let info = LogFileInfo::read_from(&path).unwrap();
        assert!(info.is_clean());
        assert_eq!(info.header.committed_len, 27);
    }

    #[test]
    fn mapped_append_past_capacity_rolls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("binlog.000001");

        let writer = LogWriter::create(&path, &Config::new().mapped(32)).unwrap();
        writer.append(b"0123456789").unwrap();
        writer.commit().unwrap();
        writer.append(b"abc").unwrap();

        let result = writer.append(&[0u8; 16]);
        assert!(matches!(
            result,
            Err(CoreError::Stream(StreamError::CapacityViolation { .. }))
        ));
        assert_eq!(writer.position(), 26);

        writer.close().unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 26);
    }

    #[test]
    fn unclean_shutdown_leaves_in_use_flag() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("binlog.000001");

        {
            let writer = LogWriter::create(&path, &Config::new()).unwrap();
            writer.append(b"never closed").unwrap();
            writer.commit().unwrap();
        }

        let info = LogFileInfo::read_from(&path).unwrap();
        assert!(info.header.is_in_use());
        assert_eq!(info.trailing_bytes(), None);
    }

    #[test]
    fn writer_is_shareable_across_threads() {
        let writer = Arc::new(memory_writer());

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let writer = Arc::clone(&writer);
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        writer.append(&[i as u8; 4]).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(writer.position(), 16 + 4 * 10 * 4);
    }

    /// Mapped stream that records every range `sync` pushed to the file.
    struct SyncRecordingStream {
        inner: MappedFileStream,
        synced: Arc<Mutex<Vec<(u64, u64)>>>,
    }

    impl OutputStream for SyncRecordingStream {
        fn write(&mut self, data: &[u8]) -> StreamResult<()> {
            self.inner.write(data)
        }

        fn seek(&mut self, offset: u64) -> StreamResult<()> {
            self.inner.seek(offset)
        }

        fn truncate(&mut self, offset: u64) -> StreamResult<()> {
            self.inner.truncate(offset)
        }

        fn flush(&mut self) -> StreamResult<()> {
            self.inner.flush()
        }

        fn sync(&mut self) -> StreamResult<()> {
            let start = self.inner.sync_pos();
            self.inner.sync()?;
            let end = self.inner.sync_pos();
            if start < end {
                self.synced.lock().push((start, end));
            }
            Ok(())
        }

        fn close(&mut self) -> StreamResult<()> {
            self.inner.close()
        }

        fn position(&self) -> u64 {
            self.inner.position()
        }

        fn state(&self) -> StreamState {
            self.inner.state()
        }
    }

    #[test]
    fn rollback_keeps_unsynced_commits_durable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("binlog.000001");
        let synced = Arc::new(Mutex::new(Vec::new()));
        let stream = SyncRecordingStream {
            inner: MappedFileStream::create(&path, &MappedOptions::with_capacity(4096)).unwrap(),
            synced: Arc::clone(&synced),
        };
        let config = Config::new().mapped(4096).sync_on_commit(false);
        let writer = LogWriter::with_stream(Box::new(stream), &config).unwrap();

        writer.append(b"data").unwrap();
        let committed = writer.commit().unwrap();
        writer.append(b"x").unwrap();
        writer.rollback().unwrap();
        writer.close().unwrap();

        let ranges = synced.lock().clone();
        for offset in 0..committed {
            assert!(
                ranges.iter().any(|&(start, end)| start <= offset && offset < end),
                "byte {offset} was never synced: {ranges:?}"
            );
        }
        assert_eq!(std::fs::read(&path).unwrap().len() as u64, committed);
    }
}
