//! Tracker error types.

use thiserror::Error;

/// Errors returned by a [`Tracker`](crate::tracker::Tracker).
#[derive(Debug, Error)]
pub enum TrackerError {
    /// GitHub API error.
    #[error("GitHub API error: {0}")]
    GitHubError(#[from] octocrab::Error),

    /// The requested issue, repository or comment does not exist.
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// The GraphQL API answered with errors.
    #[error("GraphQL error: {message}")]
    GraphQl { message: String },

    /// The API answered with something we could not interpret.
    #[error("Unexpected response from {operation}: {message}")]
    UnexpectedResponse { operation: String, message: String },

    /// The tracker refused the operation.
    #[error("Tracker unavailable during {operation}")]
    Unavailable { operation: String },
}

impl TrackerError {
    /// Returns true for a GitHub 404.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::GitHubError(octocrab::Error::GitHub { source, .. }) => {
                source.status_code.as_u16() == 404
            }
            _ => false,
        }
    }
}
