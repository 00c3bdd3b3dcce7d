//! Configuration loading.
//!
//! A single `simili.toml` describes the delayed-action policy, AI routing,
//! the similarity index, the language model and every triaged repository
//! with its transfer rules.

mod defaults;
mod error;
mod repository;
mod settings;

pub use defaults::{
    DelayedActionsConfig, Defaults, RouterConfig, TriageConfig, VectorIndexConfig,
};
pub use error::ConfigError;
pub use repository::{RepositoryConfig, RuleMatch, TransferRule};
pub use settings::Config;
