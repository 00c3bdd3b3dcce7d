//! Run summary types.

use super::result::ProcessingResult;

/// Summary of a complete run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Number of issues examined.
    pub issues_processed: usize,

    /// Number of issues transferred.
    pub transferred: usize,

    /// Number of delayed actions scheduled.
    pub scheduled: usize,

    /// Number of issues closed as duplicates.
    pub closed: usize,

    /// Number of pending actions cancelled.
    pub cancelled: usize,

    /// Number of transfers reverted.
    pub reverted: usize,

    /// Number of issues with nothing to do.
    pub skipped: usize,

    /// Number of issues that failed.
    pub failed: usize,

    /// Whether this was a dry run.
    pub dry_run: bool,
}

impl RunSummary {
    /// Creates a new empty summary.
    #[must_use]
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Default::default()
        }
    }

    /// Updates the summary with a processing result.
    pub fn record_result(&mut self, result: &ProcessingResult) {
        self.issues_processed += 1;
        match result {
            ProcessingResult::Transferred { .. } => self.transferred += 1,
            ProcessingResult::Scheduled { .. } => self.scheduled += 1,
            ProcessingResult::Closed { .. } => self.closed += 1,
            ProcessingResult::Cancelled { .. } => self.cancelled += 1,
            ProcessingResult::Reverted { .. } => self.reverted += 1,
            ProcessingResult::Skipped { .. } => self.skipped += 1,
            ProcessingResult::Failed { .. } => self.failed += 1,
        }
    }

    /// Returns true if any failures occurred.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Returns true if all operations were successful.
    #[must_use]
    pub fn all_success(&self) -> bool {
        self.failed == 0
    }
}
