//! End-of-run summary rendering.

use std::path::Path;

use dirgrab_core::download::{RunReport, TaskFailure};
use tracing::{error, info};

/// Logs the run totals and prints one line per failed resource to stdout.
pub(crate) fn print_completion_summary(report: &RunReport, output_dir: &Path, quiet: bool) {
    info!(
        downloaded = report.downloaded(),
        skipped = report.skipped(),
        failed = report.failed(),
        bytes = report.bytes_downloaded(),
        output_dir = %output_dir.display(),
        "Download Summary"
    );

    for failure in report.failures() {
        error!(resource = %failure.identifier, error = %failure.message, "Download failed");
    }

    if !quiet {
        for line in render_summary_lines(report) {
            println!("{line}");
        }
    }
}

pub(crate) fn render_summary_lines(report: &RunReport) -> Vec<String> {
    let mut lines = vec![format!(
        "{} downloaded, {} skipped, {} failed",
        report.downloaded(),
        report.skipped(),
        report.failed()
    )];
    if !report.failures().is_empty() {
        lines.push("Failed resources:".to_string());
        lines.extend(report.failures().iter().map(render_failure_line));
    }
    lines
}

fn render_failure_line(failure: &TaskFailure) -> String {
    format!("- {}: {}", failure.identifier, failure.message)
}
