//! Comment rendering using Handlebars.
//!
//! Every user-facing comment (transfer notices, pending-action notices,
//! revert and cancel acknowledgements) is rendered here.

mod error;
mod renderer;

pub use error::TemplateError;
pub use renderer::{create_handlebars_registry, reaction_emoji, TemplateRenderer};
