//! Open options for file-backed streams.

/// Default cache size for buffered streams (one I/O page).
pub const DEFAULT_CACHE_SIZE: usize = 4096;

/// Default capacity for mapped streams (1 MB).
pub const DEFAULT_MAPPED_CAPACITY: u64 = 1024 * 1024;

/// Options for opening a [`BufferedFileStream`](crate::BufferedFileStream).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferedOptions {
    /// Capacity of the in-memory write cache in bytes.
    pub cache_size: usize,

    /// Whether to empty an existing file when opening it.
    pub truncate_existing: bool,

    /// Whether to create missing parent directories.
    pub create_dirs: bool,

    /// Whether `sync` only forces file data (not metadata) to disk.
    pub data_sync_only: bool,
}

impl Default for BufferedOptions {
    fn default() -> Self {
        Self {
            cache_size: DEFAULT_CACHE_SIZE,
            truncate_existing: false,
            create_dirs: false,
            data_sync_only: false,
        }
    }
}

impl BufferedOptions {
    /// Creates options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cache capacity.
    #[must_use]
    pub const fn cache_size(mut self, size: usize) -> Self {
        self.cache_size = size;
        self
    }

    /// Sets whether an existing file is emptied at open.
    #[must_use]
    pub const fn truncate_existing(mut self, value: bool) -> Self {
        self.truncate_existing = value;
        self
    }

    /// Sets whether missing parent directories are created.
    #[must_use]
    pub const fn create_dirs(mut self, value: bool) -> Self {
        self.create_dirs = value;
        self
    }

    /// Sets whether `sync` skips metadata.
    #[must_use]
    pub const fn data_sync_only(mut self, value: bool) -> Self {
        self.data_sync_only = value;
        self
    }
}

/// Options for opening a [`MappedFileStream`](crate::MappedFileStream).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedOptions {
    /// Fixed capacity pre-allocated on disk and mapped, in bytes.
    pub capacity: u64,

    /// Whether to create missing parent directories.
    pub create_dirs: bool,
}

impl Default for MappedOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_MAPPED_CAPACITY,
            create_dirs: false,
        }
    }
}

impl MappedOptions {
    /// Creates options for a region of `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Sets the mapped capacity.
    #[must_use]
    pub const fn capacity(mut self, capacity: u64) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets whether missing parent directories are created.
    #[must_use]
    pub const fn create_dirs(mut self, value: bool) -> Self {
        self.create_dirs = value;
        self
    }
}
