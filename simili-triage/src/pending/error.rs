//! Pending action error types.

use crate::tracker::TrackerError;
use thiserror::Error;

/// Errors from reading or writing pending actions.
#[derive(Debug, Error)]
pub enum PendingError {
    /// No pending-action marker in the text.
    #[error("Pending action metadata not found")]
    MetadataNotFound,

    /// The marker was found but its JSON does not decode.
    #[error("Invalid pending action metadata: {0}")]
    InvalidMetadata(#[from] serde_json::Error),

    /// The action type is neither transfer nor close.
    #[error("Unknown action type for {org}/{repo}#{issue_number}")]
    UnknownActionType {
        org: String,
        repo: String,
        issue_number: u64,
    },

    /// Listing issues by status label failed.
    #[error("Failed to list issues labeled '{label}' in {org}/{repo}: {source}")]
    ListFailed {
        org: String,
        repo: String,
        label: String,
        #[source]
        source: TrackerError,
    },

    /// Reading comments of an issue failed.
    #[error("Failed to read comments of {org}/{repo}#{issue_number}: {source}")]
    CommentsFailed {
        org: String,
        repo: String,
        issue_number: u64,
        #[source]
        source: TrackerError,
    },

    /// Adding or removing a status label failed.
    #[error("Failed to update label '{label}' on {org}/{repo}#{issue_number}: {source}")]
    LabelFailed {
        org: String,
        repo: String,
        issue_number: u64,
        label: String,
        #[source]
        source: TrackerError,
    },
}
