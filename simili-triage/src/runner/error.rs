//! Runner error types.

use thiserror::Error;

/// Errors that can occur while running triage.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Configuration loading errors.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// Tracker client or call errors.
    #[error(transparent)]
    Tracker(#[from] crate::tracker::TrackerError),

    /// Language model construction errors.
    #[error(transparent)]
    Llm(#[from] crate::llm::LlmError),

    /// Similarity index construction errors.
    #[error(transparent)]
    Index(#[from] crate::index::IndexError),

    /// Pending action errors.
    #[error(transparent)]
    Pending(#[from] crate::pending::PendingError),

    /// Transfer or close errors.
    #[error(transparent)]
    Transfer(#[from] crate::transfer::TransferError),

    /// Revert errors.
    #[error(transparent)]
    Revert(#[from] crate::transfer::RevertError),

    /// Comment rendering errors.
    #[error(transparent)]
    Template(#[from] crate::templates::TemplateError),

    /// The original issue of a duplicate is not an http(s) URL.
    #[error("Invalid original issue URL '{url}'")]
    InvalidOriginalUrl { url: String },

    /// A repository argument is not `org/repo`.
    #[error(transparent)]
    InvalidRepository(#[from] crate::issue::InvalidRepoRef),
}
