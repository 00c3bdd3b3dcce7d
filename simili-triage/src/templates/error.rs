//! Comment rendering error types.

/// Error rendering a comment.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// Handlebars rendering error.
    #[error("Failed to render comment: {0}")]
    RenderError(#[from] handlebars::RenderError),
}
