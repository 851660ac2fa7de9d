//! Constants for the download module (timeouts, chunking, pool sizing).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large files).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Size of each write to the output file; progress advances per chunk.
pub const CHUNK_SIZE: usize = 4096;

/// Default number of parallel download workers.
pub const DEFAULT_WORKERS: usize = 3;

/// Minimum allowed worker count.
pub const MIN_WORKERS: usize = 1;

/// Maximum allowed worker count.
pub const MAX_WORKERS: usize = 64;
