//! Processing result types.

use serde::Serialize;

/// Outcome of handling one issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProcessingResult {
    /// The issue was moved.
    Transferred {
        /// `org/repo#number` before the move.
        issue: String,
        /// Destination `org/repo#number`.
        destination: String,
    },

    /// A delayed action was scheduled.
    Scheduled {
        /// `org/repo#number`.
        issue: String,
        /// `transfer` or `close`.
        action: String,
        /// Destination repository or original issue URL.
        target: String,
    },

    /// The issue was closed as a duplicate.
    Closed {
        /// `org/repo#number`.
        issue: String,
        /// URL of the original issue.
        original: String,
    },

    /// A pending action was cancelled by reaction.
    Cancelled {
        /// `org/repo#number`.
        issue: String,
        /// `transfer` or `close`.
        action: String,
    },

    /// A transfer was undone.
    Reverted {
        /// `org/repo#number` before moving back.
        issue: String,
        /// `org/repo` the issue returned to.
        source: String,
    },

    /// Nothing to do.
    Skipped {
        /// `org/repo#number`.
        issue: String,
        /// Reason for skipping.
        reason: String,
    },

    /// Processing failed.
    Failed {
        /// `org/repo#number`.
        issue: String,
        /// Error message.
        error: String,
    },
}

impl ProcessingResult {
    /// The issue this result is about.
    #[must_use]
    pub fn issue(&self) -> &str {
        match self {
            Self::Transferred { issue, .. }
            | Self::Scheduled { issue, .. }
            | Self::Closed { issue, .. }
            | Self::Cancelled { issue, .. }
            | Self::Reverted { issue, .. }
            | Self::Skipped { issue, .. }
            | Self::Failed { issue, .. } => issue,
        }
    }

    /// Returns true for [`ProcessingResult::Failed`].
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Formats `org/repo#number`.
pub(crate) fn issue_ref(org: &str, repo: &str, number: u64) -> String {
    format!("{org}/{repo}#{number}")
}
