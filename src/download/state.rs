//! Lifecycle state of a single download task.

use std::fmt;

/// Where a task is in its lifecycle.
///
/// Statuses only move forward: `Pending → Sizing → Transferring` and from
/// any non-terminal status into exactly one terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskStatus {
    /// Registered, no request issued yet.
    Pending,
    /// Request issued, waiting for status and Content-Length.
    Sizing,
    /// Body is being written to disk.
    Transferring,
    /// All bytes written.
    Completed,
    /// Ended with an error; any partial file was removed.
    Failed,
    /// Output already present; nothing fetched.
    Skipped,
}

impl TaskStatus {
    /// Returns true for `Completed`, `Failed` and `Skipped`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }

    /// Returns true if moving from `self` to `next` is a legal transition.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            Self::Pending => false,
            Self::Sizing => self == Self::Pending,
            Self::Transferring => self == Self::Sizing,
            Self::Completed => self == Self::Transferring,
            Self::Failed => true,
            Self::Skipped => self == Self::Pending,
        }
    }

    /// Returns the lowercase status label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sizing => "sizing",
            Self::Transferring => "transferring",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal task transition {from} -> {to}")]
pub struct InvalidTransition {
    /// Status before the attempted change.
    pub from: TaskStatus,
    /// Requested status.
    pub to: TaskStatus,
}

/// Counters and status for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskState {
    status: TaskStatus,
    bytes_transferred: u64,
    total_bytes: u64,
}

impl Default for TaskState {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskState {
    /// Creates a pending state with unknown size.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: TaskStatus::Pending,
            bytes_transferred: 0,
            total_bytes: 0,
        }
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Bytes written so far.
    #[must_use]
    pub fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred
    }

    /// Expected size; 0 while unknown.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Moves to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] and leaves the state untouched if the
    /// move would go backwards or leave a terminal status.
    pub fn transition(&mut self, next: TaskStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Records the declared size.
    pub fn set_total(&mut self, total: u64) {
        self.total_bytes = total;
    }

    /// Adds written bytes.
    pub fn advance(&mut self, bytes: u64) {
        self.bytes_transferred = self.bytes_transferred.saturating_add(bytes);
    }

    /// Marks an existing file of `size` bytes as fully present.
    pub(crate) fn mark_present(&mut self, size: u64) {
        self.total_bytes = size;
        self.bytes_transferred = size;
    }
}
