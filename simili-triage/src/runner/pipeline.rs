//! Per-issue workflow over injected collaborators.

use crate::config::{Config, DelayedActionsConfig};
use crate::decision::{ResolvedTarget, TransferDecision};
use crate::index::{DisabledIndex, SimilarityIndex};
use crate::issue::Issue;
use crate::llm::LanguageModel;
use crate::pending::{
    format_pending_action_metadata, ActionType, PendingAction, PendingActionStore, PendingError,
    LABEL_PENDING_CLOSE, LABEL_PENDING_TRANSFER,
};
use crate::runner::RunnerError;
use crate::summary::{issue_ref, ProcessingResult};
use crate::templates::TemplateRenderer;
use crate::tracker::{ReactionDecision, Tracker};
use crate::transfer::{
    CloseOutcome, RevertDetector, TransferExecutor, TransferOutcome, DEFAULT_COLLECTION_PREFIX,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use url::Url;

/// Triage workflow wired to its collaborators.
///
/// Every entry point handles its work sequentially and keeps no state
/// between calls; the tracker is the only source of truth.
pub struct Pipeline {
    config: Config,
    transfer_client: Arc<dyn Tracker>,
    comment_client: Arc<dyn Tracker>,
    model: Option<Arc<dyn LanguageModel>>,
    store: PendingActionStore,
    executor: TransferExecutor,
    revert: RevertDetector,
    renderer: TemplateRenderer,
    dry_run: bool,
}

impl Pipeline {
    /// Creates a pipeline without a language model or similarity index.
    ///
    /// # Arguments
    ///
    /// * `config` - Loaded configuration
    /// * `transfer_client` - Elevated identity used only for transfers
    /// * `comment_client` - Bot identity used for everything else
    /// * `dry_run` - Read and decide, but never write
    pub fn new(
        config: Config,
        transfer_client: Arc<dyn Tracker>,
        comment_client: Arc<dyn Tracker>,
        dry_run: bool,
    ) -> Self {
        let executor = build_executor(
            &config,
            Arc::clone(&transfer_client),
            Arc::clone(&comment_client),
            Arc::new(DisabledIndex),
            dry_run,
        );
        let revert = RevertDetector::new(
            Arc::clone(&comment_client),
            &config.defaults.delayed_actions,
        );
        Self {
            store: PendingActionStore::new(Arc::clone(&comment_client)),
            executor,
            revert,
            renderer: TemplateRenderer::new(),
            model: None,
            config,
            transfer_client,
            comment_client,
            dry_run,
        }
    }

    /// Enables the AI routing fallback.
    #[must_use]
    pub fn with_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Cleans transferred issues out of `index`.
    #[must_use]
    pub fn with_index(mut self, index: Arc<dyn SimilarityIndex>) -> Self {
        self.executor = build_executor(
            &self.config,
            Arc::clone(&self.transfer_client),
            Arc::clone(&self.comment_client),
            index,
            self.dry_run,
        );
        self
    }

    /// Returns the loaded configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns whether writes are suppressed.
    #[must_use]
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    fn delayed(&self) -> &DelayedActionsConfig {
        &self.config.defaults.delayed_actions
    }

    /// Decides where an issue belongs and transfers or schedules it.
    ///
    /// With delayed actions on and optimistic transfers off, a pending
    /// transfer is announced and labeled; otherwise the transfer runs now.
    /// Errors are reported as [`ProcessingResult::Failed`].
    pub async fn process_issue(&self, org: &str, repo: &str, number: u64) -> ProcessingResult {
        let span = info_span!("process_issue", org = %org, repo = %repo, issue_number = number);

        async {
            match self.try_process_issue(org, repo, number).await {
                Ok(result) => result,
                Err(e) => {
                    error!(error = %e, "Failed to process issue");
                    ProcessingResult::Failed {
                        issue: issue_ref(org, repo, number),
                        error: e.to_string(),
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn try_process_issue(
        &self,
        org: &str,
        repo: &str,
        number: u64,
    ) -> Result<ProcessingResult, RunnerError> {
        let issue = self.comment_client.get_issue(org, repo, number).await?;
        let id = issue_ref(&issue.org, &issue.repo, issue.number);

        let decision = TransferDecision::new(
            &self.config,
            Arc::clone(&self.comment_client),
            self.model.clone(),
        );
        let verdict = decision.evaluate(&issue).await;

        let Some(target) = verdict.target else {
            return Ok(ProcessingResult::Skipped {
                issue: id,
                reason: "no transfer target".to_string(),
            });
        };

        match verdict.pending {
            Some(pending) if !self.delayed().optimistic_transfers => {
                self.announce_pending_transfer(&issue, &target, &pending)
                    .await
            }
            _ => {
                let outcome = self
                    .executor
                    .transfer(&issue, &target.repo, target.rule())
                    .await?;
                Ok(transfer_result(id, &target.repo, outcome))
            }
        }
    }

    async fn announce_pending_transfer(
        &self,
        issue: &Issue,
        target: &ResolvedTarget,
        pending: &PendingAction,
    ) -> Result<ProcessingResult, RunnerError> {
        let id = issue_ref(&issue.org, &issue.repo, issue.number);

        if issue.has_label(LABEL_PENDING_TRANSFER) {
            info!("Transfer already pending");
            return Ok(ProcessingResult::Skipped {
                issue: id,
                reason: "transfer already pending".to_string(),
            });
        }

        if self.dry_run {
            info!(target_repo = %target.repo, "Dry run: would schedule transfer");
            return Ok(ProcessingResult::Skipped {
                issue: id,
                reason: format!("dry run: would schedule transfer to {}", target.repo),
            });
        }

        let delayed = self.delayed();
        let metadata = format_pending_action_metadata(pending)?;
        let notice = self.renderer.render_pending_transfer_notice(
            &target.repo,
            &target.reason(),
            pending.expires_at,
            &delayed.approve_reaction,
            &delayed.cancel_reaction,
            &metadata,
        )?;
        let comment_id = self
            .comment_client
            .post_comment(&issue.org, &issue.repo, issue.number, &notice)
            .await?;

        let action = self
            .store
            .schedule_transfer(issue, &target.repo, comment_id, delayed.delay_hours)
            .await?;

        Ok(ProcessingResult::Scheduled {
            issue: id,
            action: action.action_type.as_str().to_string(),
            target: action.target,
        })
    }

    /// Reconciles every pending action in a repository.
    ///
    /// Cancel reactions cancel; approve reactions or expiry execute;
    /// anything else waits for a later run. Per-action errors are reported
    /// as [`ProcessingResult::Failed`].
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Pending`] if issues cannot be listed.
    pub async fn process_pending(
        &self,
        org: &str,
        repo: &str,
    ) -> Result<Vec<ProcessingResult>, RunnerError> {
        let span = info_span!("process_pending", org = %org, repo = %repo);

        async {
            let actions = self.store.find_pending_actions(org, repo).await?;
            let mut results = Vec::with_capacity(actions.len());
            for action in &actions {
                results.push(self.process_action(action).await);
            }
            Ok(results)
        }
        .instrument(span)
        .await
    }

    async fn process_action(&self, action: &PendingAction) -> ProcessingResult {
        let span = info_span!(
            "pending_action",
            issue_number = action.issue_number,
            action_type = action.action_type.as_str()
        );

        async {
            match self.try_process_action(action).await {
                Ok(result) => result,
                Err(e) => {
                    error!(error = %e, "Failed to process pending action");
                    ProcessingResult::Failed {
                        issue: issue_ref(&action.org, &action.repo, action.issue_number),
                        error: e.to_string(),
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn try_process_action(
        &self,
        action: &PendingAction,
    ) -> Result<ProcessingResult, RunnerError> {
        let id = issue_ref(&action.org, &action.repo, action.issue_number);
        let label = action
            .action_type
            .label()
            .ok_or_else(|| PendingError::UnknownActionType {
                org: action.org.clone(),
                repo: action.repo.clone(),
                issue_number: action.issue_number,
            })?;

        let issue = self
            .comment_client
            .get_issue(&action.org, &action.repo, action.issue_number)
            .await?;
        if !issue.has_label(label) {
            info!("Status label already removed");
            return Ok(ProcessingResult::Skipped {
                issue: id,
                reason: "no longer pending".to_string(),
            });
        }

        let delayed = self.delayed();
        let decision = self
            .comment_client
            .reaction_decision(
                &action.org,
                &action.repo,
                action.comment_id,
                &delayed.approve_reaction,
                &delayed.cancel_reaction,
            )
            .await?;

        match decision {
            ReactionDecision::Cancel => self.cancel_action(&issue, action).await,
            ReactionDecision::Approve => {
                info!("Pending action approved");
                self.execute_action(&issue, action).await
            }
            ReactionDecision::None if action.is_expired() => {
                info!("Pending action expired");
                self.execute_action(&issue, action).await
            }
            ReactionDecision::None => Ok(ProcessingResult::Skipped {
                issue: id,
                reason: format!("waiting until {}", action.expires_at.to_rfc3339()),
            }),
        }
    }

    async fn cancel_action(
        &self,
        issue: &Issue,
        action: &PendingAction,
    ) -> Result<ProcessingResult, RunnerError> {
        let id = issue_ref(&issue.org, &issue.repo, issue.number);
        if self.dry_run {
            info!("Dry run: would cancel pending action");
            return Ok(ProcessingResult::Skipped {
                issue: id,
                reason: format!("dry run: would cancel pending {}", action.action_type.as_str()),
            });
        }

        self.store.cancel(action).await?;

        let notice = self
            .renderer
            .render_cancel_notice(action.action_type.as_str())?;
        if let Err(e) = self
            .comment_client
            .post_comment(&issue.org, &issue.repo, issue.number, &notice)
            .await
        {
            warn!(error = %e, "Failed to post cancellation notice");
        }

        Ok(ProcessingResult::Cancelled {
            issue: id,
            action: action.action_type.as_str().to_string(),
        })
    }

    async fn execute_action(
        &self,
        issue: &Issue,
        action: &PendingAction,
    ) -> Result<ProcessingResult, RunnerError> {
        let id = issue_ref(&issue.org, &issue.repo, issue.number);

        let (result, executed) = match action.action_type {
            ActionType::Transfer => {
                let outcome = self.executor.transfer(issue, &action.target, None).await?;
                let executed = !matches!(outcome, TransferOutcome::DryRun);
                (transfer_result(id, &action.target, outcome), executed)
            }
            ActionType::Close => match self.executor.close(issue, &action.target).await? {
                CloseOutcome::Closed => (
                    ProcessingResult::Closed {
                        issue: id,
                        original: action.target.clone(),
                    },
                    true,
                ),
                CloseOutcome::DryRun => (
                    ProcessingResult::Skipped {
                        issue: id,
                        reason: format!("dry run: would close as duplicate of {}", action.target),
                    },
                    false,
                ),
            },
            ActionType::Unknown => {
                return Err(PendingError::UnknownActionType {
                    org: action.org.clone(),
                    repo: action.repo.clone(),
                    issue_number: action.issue_number,
                }
                .into());
            }
        };

        if executed {
            if let Err(e) = self.store.complete(action).await {
                warn!(error = %e, "Action executed but status label could not be removed");
            }
        }

        Ok(result)
    }

    /// Moves an optimistically transferred issue back when its transfer
    /// notice carries the revert reaction. Errors are reported as
    /// [`ProcessingResult::Failed`].
    pub async fn check_revert(&self, org: &str, repo: &str, number: u64) -> ProcessingResult {
        let span = info_span!("check_revert", org = %org, repo = %repo, issue_number = number);

        async {
            match self.try_check_revert(org, repo, number).await {
                Ok(result) => result,
                Err(e) => {
                    error!(error = %e, "Failed to check for revert");
                    ProcessingResult::Failed {
                        issue: issue_ref(org, repo, number),
                        error: e.to_string(),
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn try_check_revert(
        &self,
        org: &str,
        repo: &str,
        number: u64,
    ) -> Result<ProcessingResult, RunnerError> {
        if !self.revert.is_enabled() {
            return Ok(ProcessingResult::Skipped {
                issue: issue_ref(org, repo, number),
                reason: "reverts need delayed actions and optimistic transfers".to_string(),
            });
        }

        let issue = self.comment_client.get_issue(org, repo, number).await?;
        let id = issue_ref(&issue.org, &issue.repo, issue.number);

        let Some(action) = self.revert.check_for_revert(&issue).await? else {
            return Ok(ProcessingResult::Skipped {
                issue: id,
                reason: "no revert requested".to_string(),
            });
        };

        let source = action.source();
        Ok(
            match self.revert.revert(&issue, &action, &self.executor).await? {
                TransferOutcome::Transferred { .. } => ProcessingResult::Reverted { issue: id, source },
                TransferOutcome::DryRun => ProcessingResult::Skipped {
                    issue: id,
                    reason: format!("dry run: would move back to {source}"),
                },
                TransferOutcome::AlreadyTransferred => ProcessingResult::Skipped {
                    issue: id,
                    reason: "already transferred".to_string(),
                },
            },
        )
    }

    /// Schedules closing an issue as a duplicate of `original_url`.
    ///
    /// With delayed actions disabled the issue is closed right away.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::InvalidOriginalUrl`] unless `original_url` is an
    /// http(s) URL. Other errors are reported as [`ProcessingResult::Failed`].
    pub async fn schedule_close(
        &self,
        org: &str,
        repo: &str,
        number: u64,
        original_url: &str,
    ) -> Result<ProcessingResult, RunnerError> {
        validate_issue_url(original_url)?;
        let span = info_span!("schedule_close", org = %org, repo = %repo, issue_number = number);

        let result = async {
            match self.try_schedule_close(org, repo, number, original_url).await {
                Ok(result) => result,
                Err(e) => {
                    error!(error = %e, "Failed to schedule close");
                    ProcessingResult::Failed {
                        issue: issue_ref(org, repo, number),
                        error: e.to_string(),
                    }
                }
            }
        }
        .instrument(span)
        .await;
        Ok(result)
    }

    async fn try_schedule_close(
        &self,
        org: &str,
        repo: &str,
        number: u64,
        original_url: &str,
    ) -> Result<ProcessingResult, RunnerError> {
        let issue = self.comment_client.get_issue(org, repo, number).await?;
        let id = issue_ref(&issue.org, &issue.repo, issue.number);
        let delayed = self.delayed();

        if !delayed.enabled {
            return Ok(match self.executor.close(&issue, original_url).await? {
                CloseOutcome::Closed => ProcessingResult::Closed {
                    issue: id,
                    original: original_url.to_string(),
                },
                CloseOutcome::DryRun => ProcessingResult::Skipped {
                    issue: id,
                    reason: format!("dry run: would close as duplicate of {original_url}"),
                },
            });
        }

        if issue.has_label(LABEL_PENDING_CLOSE) {
            return Ok(ProcessingResult::Skipped {
                issue: id,
                reason: "close already pending".to_string(),
            });
        }

        if self.dry_run {
            info!(original = %original_url, "Dry run: would schedule close");
            return Ok(ProcessingResult::Skipped {
                issue: id,
                reason: format!("dry run: would schedule close as duplicate of {original_url}"),
            });
        }

        let pending = PendingAction::new(
            ActionType::Close,
            &issue,
            original_url,
            0,
            delayed.delay_hours,
            Utc::now(),
        );
        let metadata = format_pending_action_metadata(&pending)?;
        let notice = self.renderer.render_pending_close_notice(
            original_url,
            pending.expires_at,
            &delayed.approve_reaction,
            &delayed.cancel_reaction,
            &metadata,
        )?;
        let comment_id = self
            .comment_client
            .post_comment(&issue.org, &issue.repo, issue.number, &notice)
            .await?;

        let action = self
            .store
            .schedule_close(&issue, original_url, comment_id, delayed.delay_hours)
            .await?;

        Ok(ProcessingResult::Scheduled {
            issue: id,
            action: action.action_type.as_str().to_string(),
            target: action.target,
        })
    }
}

fn build_executor(
    config: &Config,
    transfer_client: Arc<dyn Tracker>,
    comment_client: Arc<dyn Tracker>,
    index: Arc<dyn SimilarityIndex>,
    dry_run: bool,
) -> TransferExecutor {
    let prefix = config
        .vector_index
        .as_ref()
        .map_or(DEFAULT_COLLECTION_PREFIX, |v| v.collection_prefix.as_str());
    let delayed = &config.defaults.delayed_actions;
    let revert_reaction =
        (delayed.enabled && delayed.optimistic_transfers).then(|| delayed.cancel_reaction.clone());

    TransferExecutor::new(transfer_client, comment_client, index, dry_run)
        .with_collection_prefix(prefix)
        .with_revert_reaction(revert_reaction)
}

fn transfer_result(issue: String, target: &str, outcome: TransferOutcome) -> ProcessingResult {
    match outcome {
        TransferOutcome::Transferred { location } => ProcessingResult::Transferred {
            issue,
            destination: issue_ref(&location.org, &location.repo, location.number),
        },
        TransferOutcome::AlreadyTransferred => ProcessingResult::Skipped {
            issue,
            reason: "already transferred".to_string(),
        },
        TransferOutcome::DryRun => ProcessingResult::Skipped {
            issue,
            reason: format!("dry run: would transfer to {target}"),
        },
    }
}

fn validate_issue_url(value: &str) -> Result<(), RunnerError> {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => Ok(()),
        _ => Err(RunnerError::InvalidOriginalUrl {
            url: value.to_string(),
        }),
    }
}
