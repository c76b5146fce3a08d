//! Compressor capability consumed by [`CompressedStream`](crate::CompressedStream).

/// Result of a single [`Compressor::compress`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompressOutcome {
    /// Number of input bytes the compressor could not consume.
    pub unconsumed: usize,
    /// Whether the compressor failed outright.
    pub failed: bool,
}

impl CompressOutcome {
    /// An outcome where every input byte was consumed.
    #[must_use]
    pub const fn complete() -> Self {
        Self {
            unconsumed: 0,
            failed: false,
        }
    }

    /// An outcome where `unconsumed` bytes were left over.
    #[must_use]
    pub const fn partial(unconsumed: usize) -> Self {
        Self {
            unconsumed,
            failed: false,
        }
    }

    /// An outcome reporting failure.
    #[must_use]
    pub const fn failure() -> Self {
        Self {
            unconsumed: 0,
            failed: true,
        }
    }

    /// Returns `true` if the call succeeded and consumed the whole input.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        !self.failed && self.unconsumed == 0
    }
}

/// A byte compressor.
///
/// The compression format is the implementor's business. A stream only
/// requires that a successful call consumes the entire input range.
pub trait Compressor: Send {
    /// Feeds `input` to the compressor.
    fn compress(&mut self, input: &[u8]) -> CompressOutcome;
}

/// The identity compressor: stores input verbatim.
///
/// Output accumulates in an internal buffer, optionally bounded. When the
/// bound is reached the remaining input is reported as unconsumed.
#[derive(Debug, Clone, Default)]
pub struct NoneCompressor {
    output: Vec<u8>,
    limit: Option<usize>,
}

impl NoneCompressor {
    /// Creates an unbounded compressor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a compressor whose output buffer holds at most `limit` bytes.
    #[must_use]
    pub fn with_capacity_limit(limit: usize) -> Self {
        Self {
            output: Vec::new(),
            limit: Some(limit),
        }
    }

    /// Returns the bytes produced so far.
    #[must_use]
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Takes the produced bytes, leaving the buffer empty.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }

    /// Discards the produced bytes.
    pub fn reset(&mut self) {
        self.output.clear();
    }
}

impl Compressor for NoneCompressor {
    fn compress(&mut self, input: &[u8]) -> CompressOutcome {
        let room = match self.limit {
            Some(limit) => limit.saturating_sub(self.output.len()),
            None => input.len(),
        };
        let taken = room.min(input.len());
        self.output.extend_from_slice(&input[..taken]);
        CompressOutcome::partial(input.len() - taken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_completeness() {
        assert!(CompressOutcome::complete().is_complete());
        assert!(!CompressOutcome::partial(1).is_complete());
        assert!(!CompressOutcome::failure().is_complete());
    }

    #[test]
    fn none_compressor_stores_input() {
        let mut compressor = NoneCompressor::new();
        assert!(compressor.compress(b"abc").is_complete());
        assert!(compressor.compress(b"def").is_complete());
        assert_eq!(compressor.output(), b"abcdef");

        assert_eq!(compressor.take_output(), b"abcdef");
        assert!(compressor.output().is_empty());
    }

    #[test]
    fn none_compressor_reports_leftover_at_limit() {
        let mut compressor = NoneCompressor::with_capacity_limit(4);
        let outcome = compressor.compress(b"abcdef");
        assert_eq!(outcome, CompressOutcome::partial(2));
        assert_eq!(compressor.output(), b"abcd");

        compressor.reset();
        assert!(compressor.compress(b"wxyz").is_complete());
    }
}
