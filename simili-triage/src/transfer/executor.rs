//! Idempotent issue transfer with two identities.
//!
//! The privileged move goes through the elevated `transfer_client`; every
//! comment users see is posted by the bot `comment_client`.

use crate::config::TransferRule;
use crate::index::{collection_name, SimilarityIndex};
use crate::issue::{Issue, IssueLocation, RepoRef};
use crate::templates::TemplateRenderer;
use crate::tracker::Tracker;
use crate::transfer::{TransferError, TransferSourceMetadata};
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

/// Default similarity-index collection prefix.
pub const DEFAULT_COLLECTION_PREFIX: &str = "simili";

/// What a transfer call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The issue was moved.
    Transferred {
        /// Where the issue lives now.
        location: IssueLocation,
    },

    /// The issue had already left its recorded location; nothing was done.
    AlreadyTransferred,

    /// Dry run; nothing was written.
    DryRun,
}

/// What a close call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The issue was closed as a duplicate.
    Closed,

    /// Dry run; nothing was written.
    DryRun,
}

/// Performs transfers, revert transfers and duplicate closes.
pub struct TransferExecutor {
    transfer_client: Arc<dyn Tracker>,
    comment_client: Arc<dyn Tracker>,
    index: Arc<dyn SimilarityIndex>,
    collection_prefix: String,
    renderer: TemplateRenderer,
    revert_reaction: Option<String>,
    dry_run: bool,
}

impl TransferExecutor {
    /// Creates an executor.
    ///
    /// # Arguments
    ///
    /// * `transfer_client` - Elevated identity used for the transfer itself
    /// * `comment_client` - Bot identity used for comments and checks
    /// * `index` - Similarity index cleaned after a transfer
    /// * `dry_run` - Stop before the first write
    pub fn new(
        transfer_client: Arc<dyn Tracker>,
        comment_client: Arc<dyn Tracker>,
        index: Arc<dyn SimilarityIndex>,
        dry_run: bool,
    ) -> Self {
        Self {
            transfer_client,
            comment_client,
            index,
            collection_prefix: DEFAULT_COLLECTION_PREFIX.to_string(),
            renderer: TemplateRenderer::new(),
            revert_reaction: None,
            dry_run,
        }
    }

    /// Sets the similarity-index collection prefix.
    #[must_use]
    pub fn with_collection_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.collection_prefix = prefix.into();
        self
    }

    /// Advertises `reaction` as the way to undo a transfer in its notice.
    #[must_use]
    pub fn with_revert_reaction(mut self, reaction: Option<String>) -> Self {
        self.revert_reaction = reaction;
        self
    }

    /// Returns whether writes are suppressed.
    #[must_use]
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Transfers `issue` to `target_repo`.
    ///
    /// This function:
    /// 1. Validates the target and checks it exists
    /// 2. Returns early if the issue already moved
    /// 3. Posts the notice (with the transfer-source marker) as the bot
    /// 4. Transfers with the elevated identity
    /// 5. Removes the issue from the old organization's index collection
    ///
    /// # Arguments
    ///
    /// * `issue` - Issue to move
    /// * `target_repo` - Destination `org/repo`
    /// * `rule` - Matched rule, or `None` for AI routing
    ///
    /// # Errors
    ///
    /// Returns [`TransferError`] naming the stage that failed. Index cleanup
    /// failures are only logged.
    pub async fn transfer(
        &self,
        issue: &Issue,
        target_repo: &str,
        rule: Option<&TransferRule>,
    ) -> Result<TransferOutcome, TransferError> {
        let span = info_span!(
            "transfer",
            org = %issue.org,
            repo = %issue.repo,
            issue_number = issue.number,
            target_repo = %target_repo
        );

        async {
            let target = self.check_target(target_repo).await?;

            let moved = self
                .comment_client
                .was_already_transferred(issue)
                .await
                .map_err(|source| TransferError::CheckTransferred { source })?;
            if moved {
                info!("Issue already transferred, nothing to do");
                return Ok(TransferOutcome::AlreadyTransferred);
            }

            if self.dry_run {
                info!("Dry run: would transfer issue");
                return Ok(TransferOutcome::DryRun);
            }

            let description =
                rule.map_or_else(|| "routing rules".to_string(), |r| r.predicate.describe());
            let marker = TransferSourceMetadata::from_issue(issue).to_marker()?;
            let notice = self.renderer.render_transfer_notice(
                &target.to_string(),
                &description,
                &marker,
                self.revert_reaction.as_deref(),
            )?;
            self.comment_client
                .post_comment(&issue.org, &issue.repo, issue.number, &notice)
                .await
                .map_err(|source| TransferError::Comment { source })?;

            let location = self.move_issue(issue, &target).await?;
            Ok(TransferOutcome::Transferred { location })
        }
        .instrument(span)
        .await
    }

    /// Moves `issue` back to `source_repo`.
    ///
    /// Same as [`transfer`](Self::transfer) without the already-transferred
    /// check and the notice; the caller announces the revert.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError`] naming the stage that failed.
    pub async fn revert_transfer(
        &self,
        issue: &Issue,
        source_repo: &str,
    ) -> Result<TransferOutcome, TransferError> {
        let span = info_span!(
            "revert_transfer",
            org = %issue.org,
            repo = %issue.repo,
            issue_number = issue.number,
            target_repo = %source_repo
        );

        async {
            let target = self.check_target(source_repo).await?;

            if self.dry_run {
                info!("Dry run: would move issue back");
                return Ok(TransferOutcome::DryRun);
            }

            let location = self.move_issue(issue, &target).await?;
            Ok(TransferOutcome::Transferred { location })
        }
        .instrument(span)
        .await
    }

    /// Closes `issue` as a duplicate of `original_url`, posting a notice first.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Comment`] or [`TransferError::Close`] when
    /// the tracker rejects the write.
    pub async fn close(
        &self,
        issue: &Issue,
        original_url: &str,
    ) -> Result<CloseOutcome, TransferError> {
        let span = info_span!(
            "close_duplicate",
            org = %issue.org,
            repo = %issue.repo,
            issue_number = issue.number
        );

        async {
            if self.dry_run {
                info!(original = %original_url, "Dry run: would close issue as duplicate");
                return Ok(CloseOutcome::DryRun);
            }

            let notice = self.renderer.render_close_notice(original_url)?;
            self.comment_client
                .post_comment(&issue.org, &issue.repo, issue.number, &notice)
                .await
                .map_err(|source| TransferError::Comment { source })?;
            self.comment_client
                .close_issue(&issue.org, &issue.repo, issue.number)
                .await
                .map_err(|source| TransferError::Close { source })?;

            info!(original = %original_url, "Closed issue as duplicate");
            Ok(CloseOutcome::Closed)
        }
        .instrument(span)
        .await
    }

    async fn check_target(&self, target_repo: &str) -> Result<RepoRef, TransferError> {
        let target = RepoRef::parse(target_repo)?;
        let exists = self
            .transfer_client
            .repo_exists(&target.org, &target.repo)
            .await
            .map_err(|source| TransferError::CheckTarget {
                target: target.to_string(),
                source,
            })?;
        if !exists {
            return Err(TransferError::TargetNotFound {
                target: target.to_string(),
            });
        }
        Ok(target)
    }

    async fn move_issue(
        &self,
        issue: &Issue,
        target: &RepoRef,
    ) -> Result<IssueLocation, TransferError> {
        let location = self
            .transfer_client
            .transfer_issue(issue, target)
            .await
            .map_err(|source| TransferError::Transfer {
                target: target.to_string(),
                source,
            })?;
        info!(
            new_number = location.number,
            "Transferred issue to {}/{}", location.org, location.repo
        );

        let collection = collection_name(&self.collection_prefix, &issue.org);
        if let Err(e) = self.index.delete(&collection, &issue.index_key()).await {
            warn!(
                collection = %collection,
                error = %e,
                "Failed to remove transferred issue from similarity index"
            );
        }

        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleMatch;
    use crate::index::IndexError;
    use crate::tracker::InMemoryTracker;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingIndex {
        deleted: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl SimilarityIndex for RecordingIndex {
        async fn delete(&self, collection: &str, key: &str) -> Result<(), IndexError> {
            if self.fail {
                return Err(IndexError::InvalidUrl {
                    url: "unreachable".to_string(),
                });
            }
            self.deleted
                .lock()
                .unwrap()
                .push((collection.to_string(), key.to_string()));
            Ok(())
        }
    }

    fn issue() -> Issue {
        Issue {
            org: "acme".to_string(),
            repo: "frontend".to_string(),
            number: 12,
            title: "API returns 500".to_string(),
            body: "The /users endpoint fails".to_string(),
            author: "octocat".to_string(),
            labels: vec!["bug-ui".to_string()],
        }
    }

    fn setup(dry_run: bool) -> (Arc<InMemoryTracker>, Arc<RecordingIndex>, TransferExecutor) {
        let tracker = Arc::new(InMemoryTracker::new());
        tracker.add_issue(issue());
        tracker.add_repository("acme", "ui-kit");
        let index = Arc::new(RecordingIndex::default());
        let executor = TransferExecutor::new(tracker.clone(), tracker.clone(), index.clone(), dry_run);
        (tracker, index, executor)
    }

    fn label_rule() -> TransferRule {
        TransferRule {
            target: "acme/ui-kit".to_string(),
            predicate: RuleMatch {
                labels: vec!["bug-ui".to_string()],
                ..RuleMatch::default()
            },
        }
    }

    #[tokio::test]
    async fn transfers_with_notice_and_index_cleanup() {
        let (tracker, index, executor) = setup(false);
        let rule = label_rule();

        let outcome = executor
            .transfer(&issue(), "acme/ui-kit", Some(&rule))
            .await
            .unwrap();

        let TransferOutcome::Transferred { location } = outcome else {
            panic!("expected a transfer");
        };
        assert_eq!((location.org.as_str(), location.repo.as_str()), ("acme", "ui-kit"));

        let comments = tracker.comments("acme", "ui-kit", location.number);
        assert_eq!(comments.len(), 1);
        assert!(comments[0].body.contains("**acme/ui-kit**"));
        assert!(comments[0].body.contains("`labels: [bug-ui]`"));
        assert!(comments[0]
            .body
            .contains(r#"<!-- simili-transfer-source: {"org":"acme","repo":"frontend"} -->"#));

        let deleted = index.deleted.lock().unwrap().clone();
        assert_eq!(deleted, vec![("simili_acme".to_string(), issue().index_key())]);
    }

    #[tokio::test]
    async fn ai_transfer_describes_routing_rules() {
        let (tracker, _, executor) = setup(false);
        executor.transfer(&issue(), "acme/ui-kit", None).await.unwrap();
        let comments = tracker.comments("acme", "frontend", 12);
        assert!(comments[0].body.contains("**Matched rule:** routing rules"));
    }

    #[tokio::test]
    async fn second_transfer_is_a_no_op() {
        let (tracker, _, executor) = setup(false);

        executor.transfer(&issue(), "acme/ui-kit", None).await.unwrap();
        let again = executor.transfer(&issue(), "acme/ui-kit", None).await.unwrap();

        assert_eq!(again, TransferOutcome::AlreadyTransferred);
        assert_eq!(tracker.transfers().len(), 1);
        assert_eq!(tracker.comments("acme", "frontend", 12).len(), 1);
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() {
        let (tracker, index, executor) = setup(true);

        let outcome = executor.transfer(&issue(), "acme/ui-kit", None).await.unwrap();

        assert_eq!(outcome, TransferOutcome::DryRun);
        assert!(tracker.transfers().is_empty());
        assert!(tracker.comments("acme", "frontend", 12).is_empty());
        assert!(index.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_bad_and_missing_targets() {
        let (tracker, _, executor) = setup(false);

        let invalid = executor.transfer(&issue(), "not-a-repo", None).await;
        assert!(matches!(invalid, Err(TransferError::InvalidTarget(_))));

        let missing = executor.transfer(&issue(), "acme/nowhere", None).await;
        assert!(matches!(missing, Err(TransferError::TargetNotFound { .. })));

        tracker.fail_on("repo_exists");
        let check = executor.transfer(&issue(), "acme/ui-kit", None).await;
        assert!(matches!(check, Err(TransferError::CheckTarget { .. })));

        assert!(tracker.comments("acme", "frontend", 12).is_empty());
    }

    #[tokio::test]
    async fn transfer_failure_is_reported() {
        let (tracker, _, executor) = setup(false);
        tracker.fail_on("transfer_issue");

        let result = executor.transfer(&issue(), "acme/ui-kit", None).await;
        assert!(matches!(result, Err(TransferError::Transfer { .. })));
    }

    #[tokio::test]
    async fn index_failure_does_not_fail_transfer() {
        let tracker = Arc::new(InMemoryTracker::new());
        tracker.add_issue(issue());
        tracker.add_repository("acme", "ui-kit");
        let index = Arc::new(RecordingIndex {
            fail: true,
            ..RecordingIndex::default()
        });
        let executor = TransferExecutor::new(tracker.clone(), tracker.clone(), index, false);

        let outcome = executor.transfer(&issue(), "acme/ui-kit", None).await.unwrap();
        assert!(matches!(outcome, TransferOutcome::Transferred { .. }));
    }

    #[tokio::test]
    async fn revert_transfer_skips_notice() {
        let (tracker, _, executor) = setup(false);

        let outcome = executor.revert_transfer(&issue(), "acme/ui-kit").await.unwrap();

        assert!(matches!(outcome, TransferOutcome::Transferred { .. }));
        assert!(tracker.comments("acme", "frontend", 12).is_empty());
    }

    #[tokio::test]
    async fn close_comments_then_closes() {
        let (tracker, _, executor) = setup(false);
        let original = "https://github.com/acme/frontend/issues/3";

        let outcome = executor.close(&issue(), original).await.unwrap();

        assert_eq!(outcome, CloseOutcome::Closed);
        assert!(tracker.is_closed("acme", "frontend", 12));
        let comments = tracker.comments("acme", "frontend", 12);
        assert!(comments[0].body.contains(original));
    }
}
