//! Orchestrates triage invocations.
//!
//! [`Pipeline`] holds the workflow over injected collaborators; [`Runner`]
//! wires it to GitHub, the language model and the similarity index.

mod command;
mod config;
mod error;
mod pipeline;

pub use command::Command;
pub use config::{RunnerConfig, DEFAULT_CONFIG_PATH};
pub use error::RunnerError;
pub use pipeline::Pipeline;

use crate::config::Config;
use crate::index::{QdrantIndex, SimilarityIndex};
use crate::issue::RepoRef;
use crate::llm::{LanguageModel, SerdesModel};
use crate::summary::{ProcessingResult, RunSummary};
use crate::tracker::{GitHubTracker, Tracker};
use std::sync::Arc;
use tracing::{info, warn};

/// Runs commands against GitHub.
pub struct Runner {
    pipeline: Pipeline,
}

impl Runner {
    /// Loads the configuration and builds every client.
    ///
    /// The transfer client uses the transfer token when one is set. The
    /// language model is only built when AI routing is enabled, the
    /// similarity index only when `[vector-index]` is configured.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] if the configuration is invalid or a client
    /// cannot be constructed.
    pub fn new(config: RunnerConfig) -> Result<Self, RunnerError> {
        info!(path = %config.config_path().display(), "Loading configuration");
        let settings = Config::load(config.config_path())?;

        let comment_client: Arc<dyn Tracker> = Arc::new(GitHubTracker::new(config.token())?);
        let transfer_client: Arc<dyn Tracker> = if config.transfer_token() == config.token() {
            Arc::clone(&comment_client)
        } else {
            Arc::new(GitHubTracker::new(config.transfer_token())?)
        };

        let model: Option<Arc<dyn LanguageModel>> = if settings.triage.router.enabled {
            Some(Arc::new(SerdesModel::from_config(settings.llm.as_ref())?))
        } else {
            None
        };

        let index: Option<Arc<dyn SimilarityIndex>> = match &settings.vector_index {
            Some(vector_index) => {
                let api_key = config
                    .index_api_key()
                    .map(str::to_string)
                    .or_else(|| vector_index.api_key.clone());
                Some(Arc::new(QdrantIndex::new(&vector_index.url, api_key)?))
            }
            None => {
                warn!("No [vector-index] configured, transferred issues stay in the index");
                None
            }
        };

        let mut pipeline = Pipeline::new(
            settings,
            transfer_client,
            comment_client,
            config.dry_run(),
        );
        if let Some(model) = model {
            pipeline = pipeline.with_model(model);
        }
        if let Some(index) = index {
            pipeline = pipeline.with_index(index);
        }

        Ok(Self { pipeline })
    }

    /// Wraps an already wired pipeline.
    #[must_use]
    pub fn from_pipeline(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }

    /// Executes one command and summarizes the results.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] on critical failures: listing pending issues,
    /// or an invalid duplicate URL. Per-issue failures are counted in the
    /// summary instead.
    pub async fn run(&self, command: &Command) -> Result<RunSummary, RunnerError> {
        let mut summary = RunSummary::new(self.pipeline.dry_run());

        let results = match command {
            Command::ProcessIssue { repository, number } => vec![
                self.pipeline
                    .process_issue(&repository.org, &repository.repo, *number)
                    .await,
            ],
            Command::ProcessPending { repository } => {
                let mut results = Vec::new();
                for repository in self.pending_repositories(repository.as_ref()) {
                    results.extend(
                        self.pipeline
                            .process_pending(&repository.org, &repository.repo)
                            .await?,
                    );
                }
                results
            }
            Command::CheckRevert { repository, number } => vec![
                self.pipeline
                    .check_revert(&repository.org, &repository.repo, *number)
                    .await,
            ],
            Command::ScheduleClose {
                repository,
                number,
                original_url,
            } => vec![
                self.pipeline
                    .schedule_close(&repository.org, &repository.repo, *number, original_url)
                    .await?,
            ],
        };

        for result in &results {
            log_result(result);
            summary.record_result(result);
        }
        Ok(summary)
    }

    fn pending_repositories(&self, repository: Option<&RepoRef>) -> Vec<RepoRef> {
        match repository {
            Some(repository) => vec![repository.clone()],
            None => self
                .pipeline
                .config()
                .repositories
                .iter()
                .filter(|r| r.enabled)
                .map(|r| RepoRef::new(r.org.clone(), r.repo.clone()))
                .collect(),
        }
    }
}

fn log_result(result: &ProcessingResult) {
    match result {
        ProcessingResult::Transferred { issue, destination } => {
            info!(issue = %issue, destination = %destination, "Transferred");
        }
        ProcessingResult::Scheduled {
            issue,
            action,
            target,
        } => info!(issue = %issue, action = %action, target_repo = %target, "Scheduled"),
        ProcessingResult::Closed { issue, original } => {
            info!(issue = %issue, original = %original, "Closed as duplicate");
        }
        ProcessingResult::Cancelled { issue, action } => {
            info!(issue = %issue, action = %action, "Cancelled");
        }
        ProcessingResult::Reverted { issue, source } => {
            info!(issue = %issue, source = %source, "Reverted");
        }
        ProcessingResult::Skipped { issue, reason } => {
            info!(issue = %issue, reason = %reason, "Skipped");
        }
        ProcessingResult::Failed { issue, error } => {
            warn!(issue = %issue, error = %error, "Failed");
        }
    }
}
