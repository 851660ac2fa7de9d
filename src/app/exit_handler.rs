//! Exit status of a finished mirror run.
//!
//! Only runs that reach the download pool come through here; errors during
//! setup or discovery become [`ProcessExit::Failure`] in `main`.

use crate::ProcessExit;

/// Maps the pool's completed and failed counts to an exit status.
///
/// Skipped files count as completed, so repeating a finished run succeeds.
pub(crate) fn determine_exit_outcome(completed: usize, failed: usize) -> ProcessExit {
    if failed == 0 {
        ProcessExit::Success
    } else if completed > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}

#[cfg(test)]
mod tests {
    use super::determine_exit_outcome;
    use crate::ProcessExit;

    #[test]
    fn test_rerun_with_every_file_skipped_succeeds() {
        assert_eq!(determine_exit_outcome(12, 0), ProcessExit::Success);
    }

    #[test]
    fn test_empty_listing_succeeds() {
        assert_eq!(determine_exit_outcome(0, 0), ProcessExit::Success);
    }

    #[test]
    fn test_single_missing_file_among_many_is_partial() {
        assert_eq!(determine_exit_outcome(40, 1), ProcessExit::Partial);
        assert_eq!(determine_exit_outcome(1, 40), ProcessExit::Partial);
    }

    #[test]
    fn test_nothing_fetched_is_failure() {
        assert_eq!(determine_exit_outcome(0, 3), ProcessExit::Failure);
    }

    #[test]
    fn test_partial_exit_code_is_distinct_from_failure() {
        assert_eq!(ProcessExit::Success.code(), 0);
        assert_eq!(ProcessExit::Failure.code(), 1);
        assert_eq!(ProcessExit::Partial.code(), 2);
    }
}
