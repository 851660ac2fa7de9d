use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing_subscriber::fmt::MakeWriter;

use super::{ProgressEvent, ProgressReporter, TaskId};

const ROW_TEMPLATE: &str =
    "{msg} {wide_bar:.cyan/blue} {bytes}/{total_bytes} {bytes_per_sec} {eta}";
const FAILED_TEMPLATE: &str = "{msg:.red}";

struct Row {
    bar: ProgressBar,
    label: String,
}

#[derive(Default)]
struct Rows {
    by_task: HashMap<TaskId, Row>,
    /// Visible rows sorted by id, mirroring the order inside `multi`.
    shown: Vec<TaskId>,
}

/// Draws one `indicatif` row per visible task.
///
/// Rows are ordered by task id no matter which task registers first.
/// Completed rows are cleared; failed rows stay on screen with the failure
/// reason, also after [`ProgressReporter::finish`].
pub struct TerminalProgress {
    multi: MultiProgress,
    rows: Mutex<Rows>,
}

impl TerminalProgress {
    /// Creates a reporter drawing to stderr.
    #[must_use]
    pub fn new() -> Self {
        Self::with_multi(MultiProgress::new())
    }

    /// Creates a reporter drawing through an existing [`MultiProgress`].
    #[must_use]
    pub fn with_multi(multi: MultiProgress) -> Self {
        Self {
            multi,
            rows: Mutex::new(Rows::default()),
        }
    }

    /// Creates a reporter that renders nothing.
    #[must_use]
    pub fn hidden() -> Self {
        Self::with_multi(MultiProgress::with_draw_target(ProgressDrawTarget::hidden()))
    }

    /// Returns a log writer that prints above the progress rows.
    #[must_use]
    pub fn log_writer(&self) -> SuspendingWriter {
        SuspendingWriter {
            multi: self.multi.clone(),
        }
    }

    /// Ids of the visible rows, top to bottom.
    #[must_use]
    pub fn display_order(&self) -> Vec<TaskId> {
        self.lock_rows().shown.clone()
    }

    fn lock_rows(&self) -> std::sync::MutexGuard<'_, Rows> {
        self.rows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn with_row(&self, task: TaskId, f: impl FnOnce(&Row)) {
        if let Some(row) = self.lock_rows().by_task.get(&task) {
            f(row);
        }
    }

    fn register(&self, task: TaskId, label: String, total: u64, visible: bool) {
        let mut rows = self.lock_rows();
        let bar = if visible {
            let position = rows.shown.partition_point(|shown| *shown < task);
            let bar = self.multi.insert(position, ProgressBar::new(total));
            rows.shown.insert(position, task);
            bar.set_style(
                ProgressStyle::with_template(ROW_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar.set_message(label.clone());
            bar
        } else {
            let bar = ProgressBar::hidden();
            bar.set_length(total);
            bar.set_position(total);
            bar
        };
        rows.by_task.insert(task, Row { bar, label });
    }
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for TerminalProgress {
    fn report(&self, task: TaskId, event: ProgressEvent) {
        match event {
            ProgressEvent::Created {
                label,
                total,
                visible,
            } => self.register(task, label, total, visible),
            ProgressEvent::Started => self.with_row(task, |row| {
                row.bar.reset_elapsed();
                row.bar.enable_steady_tick(Duration::from_millis(200));
            }),
            ProgressEvent::TotalKnown(total) => self.with_row(task, |row| row.bar.set_length(total)),
            ProgressEvent::Advanced(bytes) => self.with_row(task, |row| row.bar.inc(bytes)),
            ProgressEvent::Completed => self.with_row(task, |row| {
                row.bar.set_message(format!("✔ {}", row.label));
                row.bar.finish_and_clear();
            }),
            ProgressEvent::Skipped { size } => self.with_row(task, |row| {
                row.bar.set_length(size);
                row.bar.set_position(size);
                row.bar.finish_and_clear();
            }),
            ProgressEvent::Failed { message } => self.with_row(task, |row| {
                row.bar.set_style(
                    ProgressStyle::with_template(FAILED_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_bar()),
                );
                row.bar
                    .abandon_with_message(format!("✘ {} ({message})", row.label));
            }),
        }
    }

    fn finish(&self) {
        // Abandoned (failed) rows are already finished and keep their line.
        for row in self.lock_rows().by_task.values() {
            if !row.bar.is_finished() {
                row.bar.finish_and_clear();
            }
        }
    }
}

/// `tracing` writer that suspends progress drawing while a line is written.
#[derive(Clone)]
pub struct SuspendingWriter {
    multi: MultiProgress,
}

impl Write for SuspendingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.multi.suspend(|| io::stderr().write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

impl<'a> MakeWriter<'a> for SuspendingWriter {
    type Writer = SuspendingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
