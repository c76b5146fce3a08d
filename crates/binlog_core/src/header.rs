//! Log file header.
//!
//! ## Format
//!
//! ```text
//! | magic (4) | version (2) | flags (2) | committed length (8) |
//! ```
//!
//! All integers are little-endian. The header is reserved with
//! [`FLAG_IN_USE`] set when a log file is created and rewritten when the file
//! is closed cleanly. A header still carrying the flag marks a file that was
//! not closed, e.g. after a crash.

use crate::error::{CoreError, CoreResult};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Size of the header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Magic bytes identifying a log file.
pub const LOG_MAGIC: [u8; 4] = *b"BLOG";

/// Current header version.
pub const LOG_VERSION: u16 = 1;

/// Flag set while a writer has the file open.
pub const FLAG_IN_USE: u16 = 0x0001;

/// Decoded log file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogFileHeader {
    /// Format version.
    pub version: u16,
    /// Flag bits.
    pub flags: u16,
    /// Logical end of committed data, header included.
    pub committed_len: u64,
}

impl LogFileHeader {
    /// Header written when a file is created.
    #[must_use]
    pub const fn in_use() -> Self {
        Self {
            version: LOG_VERSION,
            flags: FLAG_IN_USE,
            committed_len: 0,
        }
    }

    /// Header written when a file is closed with `committed_len` bytes.
    #[must_use]
    pub const fn finalized(committed_len: u64) -> Self {
        Self {
            version: LOG_VERSION,
            flags: 0,
            committed_len,
        }
    }

    /// Returns `true` if the file was not closed cleanly.
    #[must_use]
    pub const fn is_in_use(&self) -> bool {
        self.flags & FLAG_IN_USE != 0
    }

    /// Encodes the header.
    #[must_use]
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&LOG_MAGIC);
        bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
        bytes[6..8].copy_from_slice(&self.flags.to_le_bytes());
        bytes[8..16].copy_from_slice(&self.committed_len.to_le_bytes());
        bytes
    }

    /// Decodes a header from the first [`HEADER_SIZE`] bytes of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is too short, the magic does not match
    /// or the version is unsupported.
    pub fn decode(bytes: &[u8]) -> CoreResult<Self> {
        let header: &[u8; HEADER_SIZE] = bytes
            .get(..HEADER_SIZE)
            .and_then(|slice| slice.try_into().ok())
            .ok_or_else(|| {
                CoreError::invalid_format(format!(
                    "header too short: expected {HEADER_SIZE} bytes, got {}",
                    bytes.len()
                ))
            })?;

        if header[0..4] != LOG_MAGIC {
            return Err(CoreError::invalid_format(format!(
                "bad magic: {:?}",
                &header[0..4]
            )));
        }

        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != LOG_VERSION {
            return Err(CoreError::invalid_format(format!(
                "unsupported version {version}, expected {LOG_VERSION}"
            )));
        }

        let flags = u16::from_le_bytes([header[6], header[7]]);
        let mut len = [0u8; 8];
        len.copy_from_slice(&header[8..16]);

        Ok(Self {
            version,
            flags,
            committed_len: u64::from_le_bytes(len),
        })
    }
}

/// What can be learned about a log file from outside a writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogFileInfo {
    /// The decoded header.
    pub header: LogFileHeader,
    /// Physical size of the file.
    pub file_len: u64,
}

impl LogFileInfo {
    /// Reads the header and size of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the header is invalid.
    pub fn read_from(path: &Path) -> CoreResult<Self> {
        let mut file = File::open(path)?;
        let file_len = file.metadata()?.len();

        let mut bytes = [0u8; HEADER_SIZE];
        file.read_exact(&mut bytes).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                CoreError::invalid_format(format!("file too short for header: {file_len} bytes"))
            } else {
                CoreError::Io(e)
            }
        })?;

        Ok(Self {
            header: LogFileHeader::decode(&bytes)?,
            file_len,
        })
    }

    /// Returns `true` if the file was closed by its writer.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        !self.header.is_in_use()
    }

    /// Bytes past the committed end of a cleanly closed file.
    ///
    /// Always zero for a clean close; unknown (`None`) for a file still
    /// marked in use, since its committed length was never recorded.
    #[must_use]
    pub const fn trailing_bytes(&self) -> Option<u64> {
        if self.header.is_in_use() {
            None
        } else {
            Some(self.file_len.saturating_sub(self.header.committed_len))
        }
    }
}
