//! Similarity index error types.

use thiserror::Error;

/// Errors returned by a [`SimilarityIndex`](crate::index::SimilarityIndex).
#[derive(Debug, Error)]
pub enum IndexError {
    /// HTTP transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The index answered with a non-success status.
    #[error("Index returned {status} for collection '{collection}': {body}")]
    Status {
        collection: String,
        status: u16,
        body: String,
    },

    /// The configured URL cannot be used as a base.
    #[error("Invalid index URL '{url}'")]
    InvalidUrl { url: String },
}
