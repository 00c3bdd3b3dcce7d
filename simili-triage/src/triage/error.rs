//! AI routing error types.

use crate::llm::LlmError;
use thiserror::Error;

/// Errors from asking the language model where an issue belongs.
#[derive(Debug, Error)]
pub enum RouterError {
    /// The completion itself failed.
    #[error("AI routing completion failed: {0}")]
    Completion(#[from] LlmError),

    /// The response was not the expected JSON object.
    #[error("Failed to parse AI routing response: {source}")]
    Parse {
        response: String,
        #[source]
        source: serde_json::Error,
    },
}
