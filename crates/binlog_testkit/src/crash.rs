//! Fault injection for output streams.
//!
//! [`CrashableStream`] wraps any [`OutputStream`] and fails operations on
//! demand, simulating a disk that fills up mid-write or a device that stops
//! accepting syncs. The switches live in a shared [`CrashControl`] so they
//! can be flipped after the stream has been handed to a writer.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use binlog_testkit::crash::CrashableStream;
//!
//! let stream = CrashableStream::new(Box::new(MemoryStream::new()));
//! let control = stream.control();
//! let writer = LogWriter::with_stream(Box::new(stream), &Config::default())?;
//! control.crash_after(64);
//! ```

use binlog_stream::{OutputStream, StreamError, StreamResult, StreamState};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Points at which a failure can be injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrashPoint {
    /// Fail every write.
    Write,
    /// Fail a write part-way, after some of its bytes reached the stream.
    PartialWrite,
    /// Fail `flush`.
    Flush,
    /// Fail `sync`.
    Sync,
    /// Fail `truncate`.
    Truncate,
}

/// Shared switches controlling a [`CrashableStream`].
#[derive(Debug)]
pub struct CrashControl {
    crash_after_bytes: AtomicUsize,
    bytes_written: AtomicUsize,
    crashed: AtomicBool,
    fail_on_flush: AtomicBool,
    fail_on_sync: AtomicBool,
    fail_on_truncate: AtomicBool,
}

impl CrashControl {
    fn new() -> Self {
        Self {
            crash_after_bytes: AtomicUsize::new(usize::MAX),
            bytes_written: AtomicUsize::new(0),
            crashed: AtomicBool::new(false),
            fail_on_flush: AtomicBool::new(false),
            fail_on_sync: AtomicBool::new(false),
            fail_on_truncate: AtomicBool::new(false),
        }
    }

    /// Sets the stream to fail once `bytes` more bytes have been written.
    pub fn crash_after(&self, bytes: usize) {
        let written = self.bytes_written.load(Ordering::SeqCst);
        self.crash_after_bytes
            .store(written.saturating_add(bytes), Ordering::SeqCst);
    }

    /// Sets whether flush should fail.
    pub fn set_fail_on_flush(&self, fail: bool) {
        self.fail_on_flush.store(fail, Ordering::SeqCst);
    }

    /// Sets whether sync should fail.
    pub fn set_fail_on_sync(&self, fail: bool) {
        self.fail_on_sync.store(fail, Ordering::SeqCst);
    }

    /// Sets whether truncate should fail.
    pub fn set_fail_on_truncate(&self, fail: bool) {
        self.fail_on_truncate.store(fail, Ordering::SeqCst);
    }

    /// Arms the failure for `point`.
    pub fn arm(&self, point: CrashPoint) {
        match point {
            CrashPoint::Write => self.crash_after(0),
            CrashPoint::PartialWrite => self.crash_after(1),
            CrashPoint::Flush => self.set_fail_on_flush(true),
            CrashPoint::Sync => self.set_fail_on_sync(true),
            CrashPoint::Truncate => self.set_fail_on_truncate(true),
        }
    }

    /// Resets the crash state.
    pub fn reset(&self) {
        self.crash_after_bytes.store(usize::MAX, Ordering::SeqCst);
        self.crashed.store(false, Ordering::SeqCst);
        self.fail_on_flush.store(false, Ordering::SeqCst);
        self.fail_on_sync.store(false, Ordering::SeqCst);
        self.fail_on_truncate.store(false, Ordering::SeqCst);
    }

    /// Returns whether an injected failure has fired.
    pub fn has_crashed(&self) -> bool {
        self.crashed.load(Ordering::SeqCst)
    }

    /// Returns the number of bytes that reached the inner stream.
    pub fn bytes_written(&self) -> usize {
        self.bytes_written.load(Ordering::SeqCst)
    }

    fn fail(&self, message: &str) -> StreamError {
        self.crashed.store(true, Ordering::SeqCst);
        StreamError::Io(std::io::Error::new(std::io::ErrorKind::Other, message.to_string()))
    }
}

/// An output stream wrapper that can simulate crashes.
pub struct CrashableStream {
    inner: Box<dyn OutputStream>,
    control: Arc<CrashControl>,
}

impl CrashableStream {
    /// Creates a new crashable stream wrapping an inner stream.
    pub fn new(inner: Box<dyn OutputStream>) -> Self {
        Self {
            inner,
            control: Arc::new(CrashControl::new()),
        }
    }

    /// Returns a handle to the failure switches.
    pub fn control(&self) -> Arc<CrashControl> {
        Arc::clone(&self.control)
    }
}

impl OutputStream for CrashableStream {
    fn write(&mut self, data: &[u8]) -> StreamResult<()> {
        let written = self.control.bytes_written.load(Ordering::SeqCst);
        let threshold = self.control.crash_after_bytes.load(Ordering::SeqCst);

        if !data.is_empty() && written >= threshold {
            return Err(self.control.fail("simulated crash during write"));
        }

        // Check if this write will cross the crash threshold
        if written + data.len() > threshold {
            let partial_len = threshold - written;
            if self.inner.write(&data[..partial_len]).is_ok() {
                self.control
                    .bytes_written
                    .fetch_add(partial_len, Ordering::SeqCst);
            }
            return Err(self.control.fail("simulated crash during partial write"));
        }

        self.inner.write(data)?;
        self.control
            .bytes_written
            .fetch_add(data.len(), Ordering::SeqCst);
        Ok(())
    }

    fn seek(&mut self, offset: u64) -> StreamResult<()> {
        self.inner.seek(offset)
    }

    fn truncate(&mut self, offset: u64) -> StreamResult<()> {
        if self.control.fail_on_truncate.load(Ordering::SeqCst) {
            return Err(self.control.fail("simulated crash during truncate"));
        }
        self.inner.truncate(offset)
    }

    fn flush(&mut self) -> StreamResult<()> {
        if self.control.fail_on_flush.load(Ordering::SeqCst) {
            return Err(self.control.fail("simulated crash during flush"));
        }
        self.inner.flush()
    }

    fn sync(&mut self) -> StreamResult<()> {
        if self.control.fail_on_sync.load(Ordering::SeqCst) {
            return Err(self.control.fail("simulated crash during sync"));
        }
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
