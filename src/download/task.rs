//! A single resource download: skip check, streamed fetch, chunked write,
//! progress reporting and cleanup on failure.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};

use super::constants::CHUNK_SIZE;
use super::error::DownloadError;
use super::fetcher::{BodyStream, Fetcher};
use super::naming::OutputNameTransform;
use super::state::{TaskState, TaskStatus};
use crate::listing::join_relative;
use crate::progress::{ProgressEvent, ProgressReporter, TaskId};

/// Collaborators shared by every task of a run.
#[derive(Clone)]
pub struct DownloadContext {
    /// Transport for streamed fetches.
    pub fetcher: Arc<dyn Fetcher>,
    /// Normalized origin URL (ends with `/`).
    pub origin: String,
    /// Directory receiving the output artifacts.
    pub output_dir: PathBuf,
    /// Maps identifiers to local names.
    pub naming: Arc<dyn OutputNameTransform>,
    /// Progress sink.
    pub reporter: Arc<dyn ProgressReporter>,
}

impl DownloadContext {
    /// Local path of the artifact for `identifier`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::UnsafeOutputName`] unless the transformed name
    /// is a non-empty relative path made only of normal components.
    pub fn output_path(&self, identifier: &str) -> Result<PathBuf, DownloadError> {
        let name = self.naming.output_name(identifier);
        let relative = Path::new(&name);
        let plain = relative.components().next().is_some()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !plain {
            return Err(DownloadError::UnsafeOutputName {
                identifier: identifier.to_string(),
                name,
            });
        }
        Ok(self.output_dir.join(relative))
    }

    /// Remote URL of `identifier`.
    #[must_use]
    pub fn resource_url(&self, identifier: &str) -> String {
        join_relative(&self.origin, identifier)
    }
}

impl std::fmt::Debug for DownloadContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadContext")
            .field("origin", &self.origin)
            .field("output_dir", &self.output_dir)
            .field("naming", &self.naming)
            .finish_non_exhaustive()
    }
}

/// How a task that did not fail ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The body was fetched and written.
    Downloaded {
        /// Bytes written.
        bytes: u64,
    },
    /// A non-empty output file already existed.
    Skipped {
        /// Size of the existing file.
        bytes: u64,
    },
}

/// The unit of work for one discovered file.
#[derive(Debug)]
pub struct DownloadTask {
    id: TaskId,
    identifier: String,
    state: TaskState,
}

impl DownloadTask {
    /// Creates a pending task.
    #[must_use]
    pub fn new(id: TaskId, identifier: impl Into<String>) -> Self {
        Self {
            id,
            identifier: identifier.into(),
            state: TaskState::new(),
        }
    }

    /// Registration id.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Relative resource identifier.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> &TaskState {
        &self.state
    }

    /// Runs the task to a terminal state.
    ///
    /// Every failure is reported to the progress sink before it is returned,
    /// and no partially written file survives a failure.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] if the output name is unsafe, the request
    /// fails, the response has no Content-Length, or the body cannot be
    /// streamed to disk.
    #[instrument(skip(self, ctx), fields(task = %self.id, resource = %self.identifier))]
    pub async fn run(mut self, ctx: &DownloadContext) -> Result<TaskOutcome, DownloadError> {
        let output_path = match ctx.output_path(&self.identifier) {
            Ok(path) => path,
            Err(e) => return Err(self.reject(ctx, e)),
        };

        if let Some(size) = existing_size(&output_path).await {
            debug!(path = %output_path.display(), bytes = size, "output exists, skipping");
            self.state.mark_present(size);
            self.emit(
                ctx,
                ProgressEvent::Created {
                    label: self.identifier.clone(),
                    total: size,
                    visible: false,
                },
            );
            self.transition(ctx, TaskStatus::Skipped);
            return Ok(TaskOutcome::Skipped { bytes: size });
        }

        self.emit(ctx, self.created_row());

        let url = ctx.resource_url(&self.identifier);
        self.transition(ctx, TaskStatus::Sizing);

        let remote = match ctx.fetcher.open(&url).await {
            Ok(remote) => remote,
            Err(e) => return Err(self.fail(ctx, DownloadError::start(&url, e))),
        };
        let Some(total) = remote.content_length else {
            return Err(self.fail(
                ctx,
                DownloadError::missing_content_length(&url, remote.status),
            ));
        };

        self.state.set_total(total);
        self.emit(ctx, ProgressEvent::TotalKnown(total));
        self.transition(ctx, TaskStatus::Transferring);

        let written = match self
            .stream_to_file(ctx, remote.body, &url, &output_path)
            .await
        {
            Ok(written) => written,
            Err(e) => {
                remove_partial(&output_path).await;
                return Err(self.fail(ctx, e));
            }
        };

        if written != total {
            remove_partial(&output_path).await;
            return Err(self.fail(ctx, DownloadError::truncated(&url, total, written)));
        }

        self.transition(ctx, TaskStatus::Completed);
        info!(path = %output_path.display(), bytes = written, "download complete");
        Ok(TaskOutcome::Downloaded { bytes: written })
    }

    /// Streams `body` into `path` in [`CHUNK_SIZE`] writes, reporting each one.
    async fn stream_to_file(
        &mut self,
        ctx: &DownloadContext,
        mut body: BodyStream,
        url: &str,
        path: &Path,
    ) -> Result<u64, DownloadError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::io(parent, e))?;
        }

        let file = File::create(path)
            .await
            .map_err(|e| DownloadError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        let mut written: u64 = 0;

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| DownloadError::stream(url, e))?;
            for piece in chunk.chunks(CHUNK_SIZE) {
                writer
                    .write_all(piece)
                    .await
                    .map_err(|e| DownloadError::io(path, e))?;
                let len = piece.len() as u64;
                written += len;
                self.state.advance(len);
                self.emit(ctx, ProgressEvent::Advanced(len));
            }
        }

        writer
            .flush()
            .await
            .map_err(|e| DownloadError::io(path, e))?;

        Ok(written)
    }

    /// Fails the task before it touches the network or the file system.
    ///
    /// The sink sees a `Created` row followed by `Failed`.
    pub(crate) fn reject(mut self, ctx: &DownloadContext, error: DownloadError) -> DownloadError {
        self.emit(ctx, self.created_row());
        self.fail(ctx, error)
    }

    fn created_row(&self) -> ProgressEvent {
        ProgressEvent::Created {
            label: self.identifier.clone(),
            total: 0,
            visible: true,
        }
    }

    fn fail(&mut self, ctx: &DownloadContext, error: DownloadError) -> DownloadError {
        warn!(error = %error, phase = ?error.phase(), "download failed");
        if self.transition(ctx, TaskStatus::Failed) {
            self.emit(
                ctx,
                ProgressEvent::Failed {
                    message: error.short_reason(),
                },
            );
        }
        error
    }

    /// Applies a status change and emits the matching event.
    ///
    /// Returns false (and emits nothing) if the change is illegal.
    fn transition(&mut self, ctx: &DownloadContext, next: TaskStatus) -> bool {
        if let Err(e) = self.state.transition(next) {
            warn!(error = %e, "ignoring task transition");
            return false;
        }
        let event = match next {
            TaskStatus::Sizing => Some(ProgressEvent::Started),
            TaskStatus::Completed => Some(ProgressEvent::Completed),
            TaskStatus::Skipped => Some(ProgressEvent::Skipped {
                size: self.state.total_bytes(),
            }),
            // Failed carries a message and is emitted by `fail`.
            TaskStatus::Pending | TaskStatus::Transferring | TaskStatus::Failed => None,
        };
        if let Some(event) = event {
            self.emit(ctx, event);
        }
        true
    }

    fn emit(&self, ctx: &DownloadContext, event: ProgressEvent) {
        ctx.reporter.report(self.id, event);
    }
}

/// Size of an existing non-empty regular file at `path`.
async fn existing_size(path: &Path) -> Option<u64> {
    tokio::fs::metadata(path)
        .await
        .ok()
        .filter(|meta| meta.is_file() && meta.len() > 0)
        .map(|meta| meta.len())
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed partial file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove partial file"),
    }
}
