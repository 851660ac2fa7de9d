//! Dirgrab Core Library
//!
//! Mirrors the files published under an auto-generated HTTP directory
//! listing into a local directory.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`listing`] - Recursive discovery of leaf resources in listing pages
//! - [`cache`] - Persistent URL to body cache for listing pages
//! - [`download`] - Bounded, streaming download engine with skip and cleanup
//! - [`progress`] - Progress events and their terminal/log renderers
//!
//! A run is two phases: discovery produces the full ordered list of
//! resource identifiers, then the engine downloads them concurrently.

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod download;
pub mod listing;
pub mod progress;
mod user_agent;

// Re-export commonly used types
pub use cache::{CacheError, ResponseCache};
pub use download::{
    DEFAULT_WORKERS, DownloadContext, DownloadEngine, DownloadError, EngineError, FetchError,
    Fetcher, HttpClient, Identity, OutputNameTransform, RunReport, StripSubstrings,
};
pub use listing::{DEFAULT_MAX_DEPTH, DiscoveryError, ListingWalker};
pub use progress::{LogProgress, ProgressEvent, ProgressReporter, TaskId, TerminalProgress};
