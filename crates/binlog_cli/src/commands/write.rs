//! Write command implementation.

use super::CommandError;
use binlog_core::{Config, LogWriter};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::{debug, warn};

/// Result of writing an input into a log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    /// Payload bytes read from the input.
    pub bytes_in: u64,
    /// Number of commits issued.
    pub commits: usize,
    /// Committed length of the closed log, header included.
    pub committed_len: u64,
}

/// Runs the write command.
pub fn run(
    path: &Path,
    input: Option<&Path>,
    config: &Config,
    chunk_size: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let summary = match input {
        Some(input) => write_log(path, File::open(input)?, config, chunk_size)?,
        None => write_log(path, io::stdin().lock(), config, chunk_size)?,
    };

    println!(
        "Wrote {} bytes in {} commits to {:?} ({} bytes committed)",
        summary.bytes_in,
        summary.commits,
        path,
        summary.committed_len
    );
    Ok(())
}

/// Copies `reader` into a new log at `path`, committing every `chunk_size`
/// bytes.
///
/// If an append fails the log is closed at its last commit and the append
/// error is returned.
pub fn write_log<R: Read>(
    path: &Path,
    mut reader: R,
    config: &Config,
    chunk_size: usize,
) -> Result<WriteSummary, Box<dyn std::error::Error>> {
    if chunk_size == 0 {
        return Err(CommandError::InvalidArgument("chunk size must be non-zero".into()).into());
    }

    let writer = LogWriter::create(path, config)?;
    let mut summary = WriteSummary {
        bytes_in: 0,
        commits: 0,
        committed_len: 0,
    };
    let mut chunk = Vec::with_capacity(chunk_size);

    loop {
        chunk.clear();
        let read = match reader.by_ref().take(chunk_size as u64).read_to_end(&mut chunk) {
            Ok(read) => read,
            Err(e) => {
                close_after_failure(&writer);
                return Err(e.into());
            }
        };
        if read == 0 {
            break;
        }

        if let Err(e) = writer.append(&chunk).and_then(|_| writer.commit()) {
            close_after_failure(&writer);
            return Err(e.into());
        }
        summary.bytes_in += read as u64;
        summary.commits += 1;
        debug!(read, position = writer.position(), "committed chunk");
    }

    writer.close()?;
    summary.committed_len = writer.committed_len();
    Ok(summary)
}

fn close_after_failure(writer: &LogWriter) {
    if let Err(e) = writer.close() {
        warn!(error = %e, "failed to close log after write error");
    }
}
