//! # binlog_testkit
//!
//! Test utilities for binlog streams.
//!
//! This crate provides:
//! - Fault injection around any stream ([`CrashableStream`])
//! - A compressor that replays scripted outcomes ([`ScriptedCompressor`])
//! - Property-based test generators using proptest
//! - Temporary log file fixtures
//!
//! ## Usage
//!
//! ```rust,ignore
//! use binlog_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_log() {
//!     let log = TempLog::new();
//!     let mut stream = log.open_mapped(4096);
//!     // ... stream operations
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod compressor;
pub mod crash;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::compressor::*;
    pub use crate::crash::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use compressor::*;
pub use crash::*;
pub use fixtures::*;
pub use generators::*;
