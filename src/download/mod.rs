//! Concurrent download engine streaming discovered resources to disk.
//!
//! # Features
//!
//! - Streaming downloads written in fixed-size chunks
//! - Skip of outputs that already exist and are non-empty
//! - Removal of partial files on any mid-transfer failure
//! - Bounded worker pool; one task's failure never stops another
//! - Pluggable transport ([`Fetcher`]) and output naming ([`OutputNameTransform`])

mod client;
mod constants;
mod engine;
mod error;
mod fetcher;
mod naming;
mod state;
mod task;

pub use client::HttpClient;
pub use constants::{
    CHUNK_SIZE, CONNECT_TIMEOUT_SECS, DEFAULT_WORKERS, MAX_WORKERS, MIN_WORKERS, READ_TIMEOUT_SECS,
};
pub use engine::{DownloadEngine, EngineError, RunReport, TaskFailure};
pub use error::{DownloadError, FailurePhase, FetchError};
pub use fetcher::{BodyStream, Fetcher, RemoteBody};
pub use naming::{Identity, OutputNameTransform, StripSubstrings};
pub use state::{InvalidTransition, TaskState, TaskStatus};
pub use task::{DownloadContext, DownloadTask, TaskOutcome};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
