//! Progress reporting for download tasks.
//!
//! Download tasks never touch a display directly. Each task sends
//! [`ProgressEvent`]s tagged with its [`TaskId`] to a shared
//! [`ProgressReporter`]; implementations synchronize internally so any number
//! of workers may report at once.
//!
//! - [`TerminalProgress`] - one `indicatif` row per task
//! - [`LogProgress`] - `tracing` events only, for quiet or non-TTY runs

mod log;
mod terminal;

pub use log::LogProgress;
pub use terminal::{SuspendingWriter, TerminalProgress};

use std::fmt;

/// Identifies a task for the lifetime of one run.
///
/// Ids follow the order of the engine's input; renderers list rows by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub usize);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A state transition or counter update for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Task registered. Hidden tasks are tracked but not drawn.
    Created {
        /// Row label, normally the resource identifier.
        label: String,
        /// Initial expected size (0 when unknown).
        total: u64,
        /// Whether the row is drawn.
        visible: bool,
    },
    /// Request issued; the row starts timing.
    Started,
    /// Server declared the body size.
    TotalKnown(u64),
    /// Bytes written since the previous update.
    Advanced(u64),
    /// Transfer finished; the row is hidden.
    Completed,
    /// An existing output file was kept; total = completed = `size`.
    Skipped {
        /// Size of the existing file.
        size: u64,
    },
    /// Task failed; the row keeps an error indicator and the message.
    Failed {
        /// Status code or error text.
        message: String,
    },
}

impl ProgressEvent {
    /// Returns true for events after which the task receives no more updates.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Skipped { .. } | Self::Failed { .. }
        )
    }
}

/// Sink for task progress, shared by every worker.
pub trait ProgressReporter: Send + Sync {
    /// Records `event` for `task`.
    fn report(&self, task: TaskId, event: ProgressEvent);

    /// Called once after every task reached a terminal state.
    fn finish(&self) {}
}
