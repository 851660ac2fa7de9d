//! Download engine running a bounded pool of download tasks.
//!
//! The engine spawns one Tokio task per resource and gates them with a
//! semaphore, so at most `workers` downloads are between request and
//! terminal state at any moment.
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! use dirgrab_core::download::{DownloadContext, DownloadEngine, HttpClient, Identity};
//! use dirgrab_core::progress::LogProgress;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = DownloadContext {
//!     fetcher: Arc::new(HttpClient::new()?),
//!     origin: "https://example.com/files/".to_string(),
//!     output_dir: PathBuf::from("output"),
//!     naming: Arc::new(Identity),
//!     reporter: Arc::new(LogProgress::new()),
//! };
//! let engine = DownloadEngine::new(3)?;
//! let report = engine.run_all(vec!["a.mp4".to_string()], ctx).await;
//! println!("completed: {}, failed: {}", report.completed(), report.failed());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use super::constants::{DEFAULT_WORKERS, MAX_WORKERS, MIN_WORKERS};
use super::error::DownloadError;
use super::task::{DownloadContext, DownloadTask, TaskOutcome};
use crate::progress::{ProgressEvent, TaskId};

/// Error type for download engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid worker count provided.
    #[error("invalid worker count {value}: must be between {MIN_WORKERS} and {MAX_WORKERS}")]
    InvalidWorkers {
        /// The invalid value that was provided.
        value: usize,
    },
}

/// A task that ended in failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    /// Resource identifier.
    pub identifier: String,
    /// Rendered error.
    pub message: String,
}

/// Aggregate result of a pool run.
#[derive(Debug, Default, Clone)]
pub struct RunReport {
    downloaded: usize,
    skipped: usize,
    bytes_downloaded: u64,
    failures: Vec<TaskFailure>,
}

impl RunReport {
    /// Number of files fetched in this run.
    #[must_use]
    pub fn downloaded(&self) -> usize {
        self.downloaded
    }

    /// Number of files left untouched because they already existed.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Downloaded plus skipped.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.downloaded + self.skipped
    }

    /// Number of failed tasks.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Bytes written during this run.
    #[must_use]
    pub fn bytes_downloaded(&self) -> u64 {
        self.bytes_downloaded
    }

    /// Failed tasks, ordered by task id; aborted tasks come last.
    #[must_use]
    pub fn failures(&self) -> &[TaskFailure] {
        &self.failures
    }

    /// True when every task completed or was skipped.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Downloaded { bytes } => {
                self.downloaded += 1;
                self.bytes_downloaded += bytes;
            }
            TaskOutcome::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Concurrency coordinator for download tasks.
///
/// # Concurrency Model
///
/// - Each download runs in its own Tokio task
/// - A semaphore permit is acquired before a task starts and held until it is terminal
/// - A failing or panicking task never cancels its siblings
/// - The engine returns only after every task has finished
#[derive(Debug)]
pub struct DownloadEngine {
    workers: usize,
}

impl Default for DownloadEngine {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
        }
    }
}

impl DownloadEngine {
    /// Creates an engine running at most `workers` downloads at once.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidWorkers`] if the value is outside
    /// the valid range (1-64).
    pub fn new(workers: usize) -> Result<Self, EngineError> {
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&workers) {
            return Err(EngineError::InvalidWorkers { value: workers });
        }
        Ok(Self { workers })
    }

    /// Returns the configured worker count.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Downloads every identifier and waits for all of them.
    ///
    /// Task ids follow the order of `identifiers`. Individual failures are
    /// collected in the returned report; they do not stop other tasks.
    ///
    /// When several identifiers map to the same output name, the first one
    /// keeps it and the others fail with
    /// [`DownloadError::DuplicateOutputName`] without being fetched.
    #[instrument(skip(self, identifiers, ctx), fields(tasks = identifiers.len(), workers = self.workers))]
    pub async fn run_all(&self, identifiers: Vec<String>, ctx: DownloadContext) -> RunReport {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let ctx = Arc::new(ctx);
        let mut join_set = JoinSet::new();
        let mut results: Vec<(usize, Option<Result<TaskOutcome, DownloadError>>)> =
            Vec::with_capacity(identifiers.len());
        let mut claimed: HashMap<String, usize> = HashMap::new();

        info!("starting downloads");

        for (index, identifier) in identifiers.iter().enumerate() {
            let task = DownloadTask::new(TaskId(index), identifier.clone());
            match claimed.entry(ctx.naming.output_name(identifier)) {
                Entry::Occupied(entry) => {
                    let error = DownloadError::DuplicateOutputName {
                        identifier: identifier.clone(),
                        name: entry.key().clone(),
                        first: identifiers[*entry.get()].clone(),
                    };
                    results.push((index, Some(Err(task.reject(&ctx, error)))));
                    continue;
                }
                Entry::Vacant(entry) => {
                    entry.insert(index);
                }
            }
            let semaphore = Arc::clone(&semaphore);
            let ctx = Arc::clone(&ctx);

            join_set.spawn(async move {
                // The semaphore is never closed, so acquire only fails if it is dropped.
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, None);
                };
                (index, Some(task.run(&ctx).await))
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(join_error) => warn!(error = %join_error, "download task panicked"),
            }
        }

        let mut report = RunReport::default();
        let mut seen = vec![false; identifiers.len()];
        results.sort_by_key(|(index, _)| *index);
        for (index, result) in results {
            match result {
                Some(Ok(outcome)) => report.record(outcome),
                Some(Err(error)) => report.failures.push(TaskFailure {
                    identifier: identifiers[index].clone(),
                    message: error.to_string(),
                }),
                None => continue,
            }
            seen[index] = true;
        }

        // Tasks that panicked or never ran have no result of their own.
        for (index, ran) in seen.iter().enumerate() {
            if !ran {
                let identifier = identifiers[index].clone();
                ctx.reporter.report(
                    TaskId(index),
                    ProgressEvent::Failed {
                        message: "task aborted".to_string(),
                    },
                );
                report.failures.push(TaskFailure {
                    identifier,
                    message: "download task aborted before finishing".to_string(),
                });
            }
        }

        ctx.reporter.finish();
        debug!(failures = report.failed(), "pool drained");
        info!(
            downloaded = report.downloaded(),
            skipped = report.skipped(),
            failed = report.failed(),
            bytes = report.bytes_downloaded(),
            "downloads finished"
        );

        report
    }
}
