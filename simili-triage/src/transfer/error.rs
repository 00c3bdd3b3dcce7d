//! Transfer and revert error types.

use crate::issue::InvalidRepoRef;
use crate::templates::TemplateError;
use crate::tracker::TrackerError;
use thiserror::Error;

/// Errors from executing a transfer or close. One variant per failing stage.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Target is not `org/repo`.
    #[error(transparent)]
    InvalidTarget(#[from] InvalidRepoRef),

    /// Target repository does not exist or is not visible.
    #[error("Target repository '{target}' not found")]
    TargetNotFound { target: String },

    /// Target existence check failed.
    #[error("Failed to check target repository '{target}': {source}")]
    CheckTarget {
        target: String,
        #[source]
        source: TrackerError,
    },

    /// Already-transferred check failed.
    #[error("Failed to check whether the issue was already transferred: {source}")]
    CheckTransferred {
        #[source]
        source: TrackerError,
    },

    /// Comment rendering failed.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Transfer-source metadata could not be serialized.
    #[error("Failed to encode transfer source: {0}")]
    Metadata(#[from] serde_json::Error),

    /// Posting the notice failed.
    #[error("Failed to post comment: {source}")]
    Comment {
        #[source]
        source: TrackerError,
    },

    /// The privileged transfer failed.
    #[error("Failed to transfer issue to '{target}': {source}")]
    Transfer {
        target: String,
        #[source]
        source: TrackerError,
    },

    /// Closing the issue failed.
    #[error("Failed to close issue: {source}")]
    Close {
        #[source]
        source: TrackerError,
    },
}

/// Errors from detecting or performing a revert.
#[derive(Debug, Error)]
pub enum RevertError {
    /// Reading the issue's comments failed.
    #[error("Failed to list comments of {org}/{repo}#{issue_number}: {source}")]
    Comments {
        org: String,
        repo: String,
        issue_number: u64,
        #[source]
        source: TrackerError,
    },

    /// Rendering the revert announcement failed.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Posting the revert announcement failed.
    #[error("Failed to post revert comment: {source}")]
    Comment {
        #[source]
        source: TrackerError,
    },

    /// Moving the issue back failed.
    #[error(transparent)]
    Transfer(#[from] TransferError),
}
