//! Moving an issue back when users reject an optimistic transfer.

use crate::config::DelayedActionsConfig;
use crate::issue::Issue;
use crate::templates::TemplateRenderer;
use crate::tracker::Tracker;
use crate::transfer::{RevertError, TransferExecutor, TransferOutcome, TransferSourceMetadata};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};

/// Text every revert announcement starts with.
pub const REVERT_MARKER: &str = "↩️ Reverting transfer";

/// Returns true if `text` contains the revert marker.
#[must_use]
pub fn has_revert_marker(text: &str) -> bool {
    text.contains(REVERT_MARKER)
}

/// A transfer users asked to undo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevertAction {
    /// Owner of the repository to move back to.
    pub source_org: String,

    /// Repository to move back to.
    pub source_repo: String,

    /// Notice comment carrying the revert reaction.
    pub comment_id: u64,
}

impl RevertAction {
    /// `org/repo` to move back to.
    #[must_use]
    pub fn source(&self) -> String {
        format!("{}/{}", self.source_org, self.source_repo)
    }
}

/// Finds transfer notices that received the revert reaction.
pub struct RevertDetector {
    tracker: Arc<dyn Tracker>,
    renderer: TemplateRenderer,
    enabled: bool,
    revert_reaction: String,
}

impl RevertDetector {
    /// Creates a detector. It only acts when delayed actions and optimistic
    /// transfers are both enabled; the cancel reaction triggers a revert.
    pub fn new(tracker: Arc<dyn Tracker>, settings: &DelayedActionsConfig) -> Self {
        Self {
            tracker,
            renderer: TemplateRenderer::new(),
            enabled: settings.enabled && settings.optimistic_transfers,
            revert_reaction: settings.cancel_reaction.clone(),
        }
    }

    /// Returns whether reverts are active.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Looks for a transfer notice on `issue` carrying the revert reaction.
    ///
    /// Comments are scanned oldest first. Notices naming the issue's current
    /// repository are ignored. Reaction lookup failures are logged and the
    /// scan continues.
    ///
    /// # Errors
    ///
    /// Returns [`RevertError::Comments`] if the comments cannot be listed.
    pub async fn check_for_revert(
        &self,
        issue: &Issue,
    ) -> Result<Option<RevertAction>, RevertError> {
        if !self.enabled {
            return Ok(None);
        }

        let comments = self
            .tracker
            .list_comments(&issue.org, &issue.repo, issue.number)
            .await
            .map_err(|source| RevertError::Comments {
                org: issue.org.clone(),
                repo: issue.repo.clone(),
                issue_number: issue.number,
                source,
            })?;

        for comment in &comments {
            let Some(source) = TransferSourceMetadata::parse(&comment.body) else {
                continue;
            };
            if source.repo_ref().same_as(&issue.org, &issue.repo) {
                debug!(comment_id = comment.id, "Transfer source is the current repository");
                continue;
            }

            match self
                .tracker
                .has_reaction(&issue.org, &issue.repo, comment.id, &self.revert_reaction)
                .await
            {
                Ok(true) => {
                    info!(
                        comment_id = comment.id,
                        source = %format!("{}/{}", source.org, source.repo),
                        "Revert requested"
                    );
                    return Ok(Some(RevertAction {
                        source_org: source.org,
                        source_repo: source.repo,
                        comment_id: comment.id,
                    }));
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(comment_id = comment.id, error = %e, "Failed to read reactions");
                }
            }
        }

        Ok(None)
    }

    /// Announces the revert and moves the issue back.
    ///
    /// # Errors
    ///
    /// Returns [`RevertError`] if the announcement or the transfer fails.
    pub async fn revert(
        &self,
        issue: &Issue,
        action: &RevertAction,
        executor: &TransferExecutor,
    ) -> Result<TransferOutcome, RevertError> {
        let source = action.source();
        let span = info_span!(
            "revert",
            org = %issue.org,
            repo = %issue.repo,
            issue_number = issue.number,
            source = %source
        );

        async {
            if executor.dry_run() {
                info!("Dry run: would revert transfer");
                return Ok(TransferOutcome::DryRun);
            }

            let message = self.renderer.render_revert_message(&source)?;
            self.tracker
                .post_comment(&issue.org, &issue.repo, issue.number, &message)
                .await
                .map_err(|source| RevertError::Comment { source })?;

            Ok(executor.revert_transfer(issue, &source).await?)
        }
        .instrument(span)
        .await
    }
}
