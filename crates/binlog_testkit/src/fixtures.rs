//! Temporary log file fixtures.
//!
//! Provides convenience functions for setting up scratch log files and
//! reading them back.

use binlog_core::{Config, LogWriter};
use binlog_stream::{BufferedFileStream, BufferedOptions, MappedFileStream, MappedOptions};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch log file path inside a temporary directory.
///
/// The directory is removed when the fixture is dropped.
pub struct TempLog {
    path: PathBuf,
    /// Kept alive to prevent cleanup.
    _temp_dir: TempDir,
}

impl TempLog {
    /// Creates a fixture named `binlog.000001` in a fresh directory.
    pub fn new() -> Self {
        Self::named("binlog.000001")
    }

    /// Creates a fixture with the given file name in a fresh directory.
    pub fn named(name: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        Self {
            path: temp_dir.path().join(name),
            _temp_dir: temp_dir,
        }
    }

    /// Returns the log file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens a buffered stream with a cache of `cache_size` bytes.
    pub fn open_buffered(&self, cache_size: usize) -> BufferedFileStream {
        BufferedFileStream::create(&self.path, &BufferedOptions::new().cache_size(cache_size))
            .expect("Failed to open buffered stream")
    }

    /// Opens a mapped stream with `capacity` bytes pre-allocated.
    pub fn open_mapped(&self, capacity: u64) -> MappedFileStream {
        MappedFileStream::create(&self.path, &MappedOptions::with_capacity(capacity))
            .expect("Failed to open mapped stream")
    }

    /// Creates a log writer on this path.
    pub fn writer(&self, config: &Config) -> LogWriter {
        LogWriter::create(&self.path, config).expect("Failed to create log writer")
    }

    /// Reads the whole file.
    pub fn contents(&self) -> Vec<u8> {
        read_file(&self.path)
    }

    /// Returns the physical file size.
    pub fn len(&self) -> u64 {
        file_len(&self.path)
    }

    /// Returns `true` if the file is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TempLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads a file, panicking on failure.
pub fn read_file(path: &Path) -> Vec<u8> {
    std::fs::read(path).expect("Failed to read file")
}

/// Returns the size of a file, panicking on failure.
pub fn file_len(path: &Path) -> u64 {
    std::fs::metadata(path)
        .expect("Failed to stat file")
        .len()
}

/// Runs a test against a fresh scratch log.
pub fn with_temp_log<F, R>(f: F) -> R
where
    F: FnOnce(&TempLog) -> R,
{
    let log = TempLog::new();
    f(&log)
}
