//! Shared helpers for the binlog benchmarks.

#![warn(missing_docs)]

use rand::Rng;

/// Generates `size` random payload bytes.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Payload sizes exercised by every group.
pub const PAYLOAD_SIZES: [usize; 4] = [64, 256, 1024, 4096];
