//! Log writer configuration.

use binlog_stream::{BufferedOptions, MappedOptions, DEFAULT_CACHE_SIZE};

/// Write strategy used for a log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// Page-cache writes through a fixed-size cache.
    Buffered,
    /// Direct writes into a memory map of `capacity` pre-allocated bytes.
    Mapped {
        /// Bytes pre-allocated and mapped when the file is created.
        capacity: u64,
    },
}

/// Configuration for creating a log file.
#[derive(Debug, Clone)]
pub struct Config {
    /// Which stream implementation backs the log.
    pub stream: StreamKind,

    /// Whether to sync on every commit (safer but slower).
    pub sync_on_commit: bool,

    /// Cache size for buffered streams.
    pub cache_size: usize,

    /// Whether to create missing parent directories.
    pub create_dirs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stream: StreamKind::Buffered,
            sync_on_commit: true,
            cache_size: DEFAULT_CACHE_SIZE,
            create_dirs: false,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the buffered strategy.
    #[must_use]
    pub const fn buffered(mut self) -> Self {
        self.stream = StreamKind::Buffered;
        self
    }

    /// Selects the mapped strategy with the given capacity.
    #[must_use]
    pub const fn mapped(mut self, capacity: u64) -> Self {
        self.stream = StreamKind::Mapped { capacity };
        self
    }

    /// Sets whether to sync on every commit.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Sets the buffered cache size.
    #[must_use]
    pub const fn cache_size(mut self, size: usize) -> Self {
        self.cache_size = size;
        self
    }

    /// Sets whether to create missing parent directories.
    #[must_use]
    pub const fn create_dirs(mut self, value: bool) -> Self {
        self.create_dirs = value;
        self
    }

    /// Options for a buffered stream; new log files start empty.
    #[must_use]
    pub fn buffered_options(&self) -> BufferedOptions {
        BufferedOptions::new()
            .cache_size(self.cache_size)
            .truncate_existing(true)
            .create_dirs(self.create_dirs)
    }

    /// Options for a mapped stream of `capacity` bytes.
    #[must_use]
    pub fn mapped_options(&self, capacity: u64) -> MappedOptions {
        MappedOptions::with_capacity(capacity).create_dirs(self.create_dirs)
    }
}
