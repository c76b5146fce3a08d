//! Compressing stream: routes written bytes through a borrowed compressor.
//!
//! The stream does not own the compressor. It borrows it for `'c`, so the
//! compressor must outlive the stream and is handed back untouched when the
//! stream goes away.
//!
//! ## Supported Operations
//!
//! The decorator has no backing file of its own:
//!
//! - `write` forwards the full range to the compressor
//! - `flush` and `sync` succeed without effect; the compressor owns its output
//! - `seek` and `truncate` are unsupported, compressed output cannot be patched
//! - `close` only ends the lifecycle

use crate::compressor::Compressor;
use crate::error::{StreamError, StreamResult};
use crate::stream::{OutputStream, StreamState};

/// An output stream that feeds every write to a [`Compressor`].
///
/// A write fails if no compressor is attached, if the compressor reports
/// failure, or if it leaves any input unconsumed.
///
/// # Example
///
/// ```rust
/// use binlog_stream::{CompressedStream, NoneCompressor, OutputStream};
///
/// let mut compressor = NoneCompressor::new();
/// {
///     let mut stream = CompressedStream::with_compressor(&mut compressor);
///     stream.write(b"row image").unwrap();
/// }
/// assert_eq!(compressor.output(), b"row image");
/// ```
pub struct CompressedStream<'c> {
    compressor: Option<&'c mut dyn Compressor>,
    position: u64,
    state: StreamState,
}

impl<'c> CompressedStream<'c> {
    /// Creates a stream with no compressor attached.
    ///
    /// Every write fails until one is set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            compressor: None,
            position: 0,
            state: StreamState::Open,
        }
    }

    /// Creates a stream borrowing `compressor`.
    #[must_use]
    pub fn with_compressor(compressor: &'c mut dyn Compressor) -> Self {
        Self {
            compressor: Some(compressor),
            ..Self::new()
        }
    }

    /// Attaches (or detaches, with `None`) the compressor.
    pub fn set_compressor(&mut self, compressor: Option<&'c mut dyn Compressor>) {
        self.compressor = compressor;
    }

    /// Returns `true` if a compressor is attached.
    #[must_use]
    pub fn has_compressor(&self) -> bool {
        self.compressor.is_some()
    }

    /// Detaches and returns the compressor.
    pub fn take_compressor(&mut self) -> Option<&'c mut dyn Compressor> {
        self.compressor.take()
    }
}

impl Default for CompressedStream<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CompressedStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressedStream")
            .field("has_compressor", &self.compressor.is_some())
            .field("position", &self.position)
            .field("state", &self.state)
            .finish()
    }
}

impl OutputStream for CompressedStream<'_> {
    fn write(&mut self, data: &[u8]) -> StreamResult<()> {
        self.state.ensure_open()?;

        let compressor = self
            .compressor
            .as_deref_mut()
            .ok_or_else(|| StreamError::compression("no compressor attached"))?;

        let outcome = compressor.compress(data);
        if outcome.failed {
            return Err(StreamError::compression("compressor reported failure"));
        }
        if outcome.unconsumed > 0 {
            return Err(StreamError::compression(format!(
                "compressor left {} of {} bytes unconsumed",
                outcome.unconsumed,
                data.len()
            )));
        }

        self.position += data.len() as u64;
        Ok(())
    }

    fn seek(&mut self, _offset: u64) -> StreamResult<()> {
        self.state.ensure_open()?;
        Err(StreamError::Unsupported("seek on a compressed stream"))
    }

    fn truncate(&mut self, _offset: u64) -> StreamResult<()> {
        self.state.ensure_open()?;
        Err(StreamError::Unsupported("truncate on a compressed stream"))
    }

    fn flush(&mut self) -> StreamResult<()> {
        self.state.ensure_open()
    }

    fn sync(&mut self) -> StreamResult<()> {
        self.state.ensure_open()
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compressor::{CompressOutcome, NoneCompressor};

    /// Compressor returning a fixed outcome.
    struct FixedCompressor(CompressOutcome);

    impl Compressor for FixedCompressor {
        fn compress(&mut self, _input: &[u8]) -> CompressOutcome {
            self.0
        }
    }

    #[test]
    fn write_without_compressor_fails() {
        let mut stream = CompressedStream::new();
        assert!(!stream.has_compressor());
        assert!(matches!(
            stream.write(b"data"),
            Err(StreamError::Compression { .. })
        ));
        assert!(matches!(
            stream.write(b""),
            Err(StreamError::Compression { .. })
        ));
        assert_eq!(stream.position(), 0);
    }

    #[test]
    fn complete_outcome_succeeds() {
        let mut compressor = FixedCompressor(CompressOutcome::complete());
        let mut stream = CompressedStream::with_compressor(&mut compressor);
        stream.write(b"data").unwrap();
        assert_eq!(stream.position(), 4);
    }

    #[test]
    fn leftover_bytes_fail_the_write() {
        let mut compressor = FixedCompressor(CompressOutcome::partial(3));
        let mut stream = CompressedStream::with_compressor(&mut compressor);
        assert!(matches!(
            stream.write(b"data"),
            Err(StreamError::Compression { .. })
        ));
    }

    #[test]
    fn reported_failure_fails_the_write() {
        let mut compressor = FixedCompressor(CompressOutcome::failure());
        let mut stream = CompressedStream::with_compressor(&mut compressor);
        assert!(stream.write(b"data").is_err());
    }

    #[test]
    fn compressor_is_borrowed_not_owned() {
        let mut compressor = NoneCompressor::with_capacity_limit(8);
        {
            let mut stream = CompressedStream::with_compressor(&mut compressor);
            stream.write(b"12345").unwrap();
            assert!(stream.write(b"6789").is_err());
            stream.close().unwrap();
        }
        assert_eq!(compressor.output(), b"12345678");
    }

    #[test]
    fn set_and_take_compressor() {
        let mut compressor = NoneCompressor::new();
        let mut stream = CompressedStream::new();
        stream.set_compressor(Some(&mut compressor));
        stream.write(b"abc").unwrap();

        assert!(stream.take_compressor().is_some());
        assert!(stream.write(b"abc").is_err());
    }

    #[test]
    fn repositioning_is_unsupported() {
        let mut stream = CompressedStream::new();
        assert!(matches!(stream.seek(0), Err(StreamError::Unsupported(_))));
        assert!(matches!(stream.truncate(0), Err(StreamError::Unsupported(_))));
        assert!(stream.flush().is_ok());
        assert!(stream.sync().is_ok());
    }

    #[test]
    fn closed_stream_rejects_everything() {
        let mut compressor = NoneCompressor::new();
        let mut stream = CompressedStream::with_compressor(&mut compressor);
        stream.close().unwrap();
        assert!(matches!(stream.write(b"x"), Err(StreamError::NotOpen(_))));
        assert!(matches!(stream.flush(), Err(StreamError::NotOpen(_))));
    }
}
