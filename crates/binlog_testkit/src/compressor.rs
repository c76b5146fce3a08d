//! Scripted compressor for exercising compressed streams.

use binlog_stream::{CompressOutcome, Compressor};
use std::collections::VecDeque;

/// A compressor that replays a script of outcomes.
///
/// Each `compress` call pops the next scripted outcome; once the script is
/// exhausted the default outcome is returned. Every input is recorded.
#[derive(Debug, Clone, Default)]
pub struct ScriptedCompressor {
    script: VecDeque<CompressOutcome>,
    default: CompressOutcome,
    inputs: Vec<Vec<u8>>,
}

impl ScriptedCompressor {
    /// Creates a compressor that always consumes its whole input.
    pub fn accepting() -> Self {
        Self::default()
    }

    /// Creates a compressor that always reports `outcome`.
    pub fn always(outcome: CompressOutcome) -> Self {
        Self {
            default: outcome,
            ..Self::default()
        }
    }

    /// Queues `outcome` for the next unscripted call.
    #[must_use]
    pub fn then(mut self, outcome: CompressOutcome) -> Self {
        self.script.push_back(outcome);
        self
    }

    /// Returns every input seen so far.
    pub fn inputs(&self) -> &[Vec<u8>] {
        &self.inputs
    }

    /// Returns the number of `compress` calls.
    pub fn calls(&self) -> usize {
        self.inputs.len()
    }
}

impl Compressor for ScriptedCompressor {
    fn compress(&mut self, input: &[u8]) -> CompressOutcome {
        self.inputs.push(input.to_vec());
        self.script.pop_front().unwrap_or(self.default)
    }
}
