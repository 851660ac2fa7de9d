use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, info, warn};

use super::{ProgressEvent, ProgressReporter, TaskId};

/// Reports task transitions as `tracing` events instead of drawing rows.
#[derive(Debug, Default)]
pub struct LogProgress {
    labels: Mutex<HashMap<TaskId, String>>,
}

impl LogProgress {
    /// Creates an empty reporter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn label(&self, task: TaskId) -> String {
        self.labels
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&task)
            .cloned()
            .unwrap_or_else(|| task.to_string())
    }
}

impl ProgressReporter for LogProgress {
    fn report(&self, task: TaskId, event: ProgressEvent) {
        match event {
            ProgressEvent::Created { label, .. } => {
                self.labels
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .insert(task, label);
            }
            ProgressEvent::Started => {
                debug!(task = %task, resource = %self.label(task), "download started");
            }
            ProgressEvent::TotalKnown(total) => {
                info!(resource = %self.label(task), bytes = total, "downloading");
            }
            ProgressEvent::Advanced(_) => {}
            ProgressEvent::Completed => {
                info!(resource = %self.label(task), "download complete");
            }
            ProgressEvent::Skipped { size } => {
                debug!(resource = %self.label(task), bytes = size, "already present, skipped");
            }
            ProgressEvent::Failed { message } => {
                warn!(resource = %self.label(task), error = %message, "download failed");
            }
        }
    }
}
