#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

pub mod config;
pub mod decision;
pub mod index;
pub mod issue;
pub mod llm;
pub mod pending;
pub mod runner;
pub mod summary;
pub mod templates;
pub mod tracker;
pub mod transfer;
pub mod triage;

pub use config::{Config, ConfigError, RepositoryConfig, RuleMatch, TransferRule};
pub use decision::{ResolvedTarget, TargetOrigin, TransferDecision, TransferVerdict};
pub use index::{collection_name, DisabledIndex, IndexError, QdrantIndex, SimilarityIndex};
pub use issue::{InvalidRepoRef, Issue, IssueComment, IssueLocation, Reaction, RepoRef};
pub use llm::{LanguageModel, LlmConfig, LlmError, SerdesModel};
pub use pending::{
    format_pending_action_metadata, parse_pending_action_metadata, ActionType, PendingAction,
    PendingActionStore, PendingError,
};
pub use runner::{Command, Pipeline, Runner, RunnerConfig, RunnerError};
pub use summary::{ProcessingResult, RunSummary};
pub use templates::{create_handlebars_registry, TemplateError, TemplateRenderer};
pub use tracker::{GitHubTracker, InMemoryTracker, ReactionDecision, Tracker, TrackerError};
pub use transfer::{
    RevertAction, RevertDetector, RevertError, RuleMatcher, TransferError, TransferExecutor,
    TransferOutcome, TransferSourceMetadata,
};
pub use triage::{Router, RouterError, RoutingResult};
