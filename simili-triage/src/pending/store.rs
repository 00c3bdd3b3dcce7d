//! Scheduling and discovery of pending actions through the tracker.

use crate::issue::Issue;
use crate::pending::{
    parse_pending_action_metadata, ActionType, PendingAction, PendingError,
    LABEL_PENDING_CLOSE, LABEL_PENDING_TRANSFER,
};
use crate::tracker::Tracker;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

/// Reads and writes pending actions; labels index them, comments carry them.
pub struct PendingActionStore {
    tracker: Arc<dyn Tracker>,
}

impl PendingActionStore {
    /// Creates a store writing through the bot identity.
    pub fn new(tracker: Arc<dyn Tracker>) -> Self {
        Self { tracker }
    }

    /// Schedules a transfer of `issue` to `target`.
    ///
    /// The caller posts the comment carrying the metadata first; `comment_id`
    /// is that comment.
    ///
    /// # Errors
    ///
    /// Returns [`PendingError::LabelFailed`] if the status label cannot be added.
    pub async fn schedule_transfer(
        &self,
        issue: &Issue,
        target: &str,
        comment_id: u64,
        delay_hours: u32,
    ) -> Result<PendingAction, PendingError> {
        let action = PendingAction::new(
            ActionType::Transfer,
            issue,
            target,
            comment_id,
            delay_hours,
            Utc::now(),
        );
        self.add_label(issue, LABEL_PENDING_TRANSFER).await?;
        info!(target_repo = target, expires_at = %action.expires_at, "Scheduled transfer");
        Ok(action)
    }

    /// Schedules closing `issue` as a duplicate of `original_url`.
    ///
    /// # Errors
    ///
    /// Returns [`PendingError::LabelFailed`] if the status label cannot be added.
    pub async fn schedule_close(
        &self,
        issue: &Issue,
        original_url: &str,
        comment_id: u64,
        delay_hours: u32,
    ) -> Result<PendingAction, PendingError> {
        let action = PendingAction::new(
            ActionType::Close,
            issue,
            original_url,
            comment_id,
            delay_hours,
            Utc::now(),
        );
        self.add_label(issue, LABEL_PENDING_CLOSE).await?;
        info!(original_url, expires_at = %action.expires_at, "Scheduled close");
        Ok(action)
    }

    /// Finds every live pending action in a repository.
    ///
    /// Issues whose label has no matching metadata comment are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`PendingError::ListFailed`] if listing by label fails.
    pub async fn find_pending_actions(
        &self,
        org: &str,
        repo: &str,
    ) -> Result<Vec<PendingAction>, PendingError> {
        let mut actions = Vec::new();

        for action_type in [ActionType::Transfer, ActionType::Close] {
            let Some(label) = action_type.label() else {
                continue;
            };
            let issues = self
                .tracker
                .list_issues_by_label(org, repo, label)
                .await
                .map_err(|source| PendingError::ListFailed {
                    org: org.to_string(),
                    repo: repo.to_string(),
                    label: label.to_string(),
                    source,
                })?;

            for issue in issues {
                match self.find_action(&issue, action_type).await {
                    Ok(Some(action)) => actions.push(action),
                    Ok(None) => {
                        debug!(
                            issue_number = issue.number,
                            label, "Labeled issue has no pending action"
                        );
                    }
                    Err(e) => {
                        debug!(
                            issue_number = issue.number,
                            error = %e,
                            "Failed to extract pending action"
                        );
                    }
                }
            }
        }

        info!(org, repo, count = actions.len(), "Found pending actions");
        Ok(actions)
    }

    /// Extracts the pending action of `action_type` from an issue's comments.
    ///
    /// Scans newest first and accepts the first marker whose type and issue
    /// number match. Org and repo come from the issue; `comment_id` is the
    /// comment the marker was found in.
    ///
    /// # Errors
    ///
    /// Returns [`PendingError::CommentsFailed`] if comments cannot be read.
    pub async fn find_action(
        &self,
        issue: &Issue,
        action_type: ActionType,
    ) -> Result<Option<PendingAction>, PendingError> {
        let comments = self
            .tracker
            .list_comments(&issue.org, &issue.repo, issue.number)
            .await
            .map_err(|source| PendingError::CommentsFailed {
                org: issue.org.clone(),
                repo: issue.repo.clone(),
                issue_number: issue.number,
                source,
            })?;

        for comment in comments.iter().rev() {
            let Ok(mut action) = parse_pending_action_metadata(&comment.body) else {
                continue;
            };
            if action.action_type == action_type && action.issue_number == issue.number {
                action.org = issue.org.clone();
                action.repo = issue.repo.clone();
                action.comment_id = comment.id;
                return Ok(Some(action));
            }
        }

        Ok(None)
    }

    /// Cancels an action by removing its status label.
    ///
    /// # Errors
    ///
    /// Returns [`PendingError::UnknownActionType`] for an unrecognized type and
    /// [`PendingError::LabelFailed`] if the label cannot be removed.
    pub async fn cancel(&self, action: &PendingAction) -> Result<(), PendingError> {
        self.remove_label(action).await?;
        info!(
            action_type = action.action_type.as_str(),
            issue_number = action.issue_number,
            "Cancelled pending action"
        );
        Ok(())
    }

    /// Retires an action after it was executed.
    ///
    /// # Errors
    ///
    /// Same as [`cancel`](Self::cancel).
    pub async fn complete(&self, action: &PendingAction) -> Result<(), PendingError> {
        self.remove_label(action).await
    }

    async fn add_label(&self, issue: &Issue, label: &str) -> Result<(), PendingError> {
        self.tracker
            .add_labels(&issue.org, &issue.repo, issue.number, &[label.to_string()])
            .await
            .map_err(|source| PendingError::LabelFailed {
                org: issue.org.clone(),
                repo: issue.repo.clone(),
                issue_number: issue.number,
                label: label.to_string(),
                source,
            })
    }

    async fn remove_label(&self, action: &PendingAction) -> Result<(), PendingError> {
        let label = action
            .action_type
            .label()
            .ok_or_else(|| PendingError::UnknownActionType {
                org: action.org.clone(),
                repo: action.repo.clone(),
                issue_number: action.issue_number,
            })?;

        self.tracker
            .remove_label(&action.org, &action.repo, action.issue_number, label)
            .await
            .map_err(|source| PendingError::LabelFailed {
                org: action.org.clone(),
                repo: action.repo.clone(),
                issue_number: action.issue_number,
                label: label.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pending::format_pending_action_metadata;
    use crate::tracker::InMemoryTracker;
    use chrono::Duration;

    fn issue(number: u64, labels: &[&str]) -> Issue {
        Issue {
            org: "acme".to_string(),
            repo: "frontend".to_string(),
            number,
            title: "Slow endpoint".to_string(),
            body: String::new(),
            author: "octocat".to_string(),
            labels: labels.iter().map(|l| (*l).to_string()).collect(),
        }
    }

    fn marker(action_type: ActionType, number: u64, target: &str) -> String {
        let action = PendingAction::new(
            action_type,
            &issue(number, &[]),
            target,
            0,
            24,
            Utc::now(),
        );
        format_pending_action_metadata(&action).unwrap()
    }

    fn setup() -> (Arc<InMemoryTracker>, PendingActionStore) {
        let tracker = Arc::new(InMemoryTracker::new());
        let store = PendingActionStore::new(tracker.clone());
        (tracker, store)
    }

    #[tokio::test]
    async fn schedule_transfer_adds_label_and_sets_expiry() {
        let (tracker, store) = setup();
        tracker.add_issue(issue(1, &[]));

        let action = store
            .schedule_transfer(&issue(1, &[]), "acme/backend", 55, 24)
            .await
            .unwrap();

        assert_eq!(action.action_type, ActionType::Transfer);
        assert_eq!(action.comment_id, 55);
        assert_eq!(action.expires_at - action.scheduled_at, Duration::hours(24));
        assert!(tracker
            .issue("acme", "frontend", 1)
            .unwrap()
            .has_label(LABEL_PENDING_TRANSFER));
    }

    #[tokio::test]
    async fn schedule_fails_when_label_cannot_be_added() {
        let (tracker, store) = setup();
        tracker.add_issue(issue(1, &[]));
        tracker.fail_on("add_labels");

        let result = store
            .schedule_close(&issue(1, &[]), "https://github.com/acme/frontend/issues/9", 5, 24)
            .await;
        assert!(matches!(result, Err(PendingError::LabelFailed { .. })));
    }

    #[tokio::test]
    async fn finds_actions_and_uses_carrying_comment_id() {
        let (tracker, store) = setup();
        tracker.add_issue(issue(1, &[LABEL_PENDING_TRANSFER]));
        let comment_id = tracker
            .add_comment(
                "acme",
                "frontend",
                1,
                "simili-bot",
                &format!("Moving soon.\n\n{}", marker(ActionType::Transfer, 1, "acme/backend")),
                Duration::hours(2),
            )
            .unwrap();

        let actions = store.find_pending_actions("acme", "frontend").await.unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].target, "acme/backend");
        assert_eq!(actions[0].comment_id, comment_id);
    }

    #[tokio::test]
    async fn prefers_newest_matching_comment() {
        let (tracker, store) = setup();
        tracker.add_issue(issue(1, &[LABEL_PENDING_TRANSFER]));
        tracker
            .add_comment(
                "acme",
                "frontend",
                1,
                "simili-bot",
                &marker(ActionType::Transfer, 1, "acme/old-target"),
                Duration::hours(5),
            )
            .unwrap();
        tracker
            .add_comment(
                "acme",
                "frontend",
                1,
                "simili-bot",
                &marker(ActionType::Transfer, 1, "acme/new-target"),
                Duration::hours(1),
            )
            .unwrap();

        let actions = store.find_pending_actions("acme", "frontend").await.unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].target, "acme/new-target");
    }

    #[tokio::test]
    async fn ignores_mismatched_and_malformed_metadata() {
        let (tracker, store) = setup();
        tracker.add_issue(issue(1, &[LABEL_PENDING_TRANSFER]));
        tracker.add_issue(issue(2, &[LABEL_PENDING_CLOSE]));
        for body in [
            marker(ActionType::Transfer, 99, "acme/backend"),
            marker(ActionType::Close, 1, "https://github.com/acme/frontend/issues/3"),
            "<!-- simili-pending-action: {broken} -->".to_string(),
        ] {
            tracker
                .add_comment("acme", "frontend", 1, "simili-bot", &body, Duration::hours(1))
                .unwrap();
        }

        let actions = store.find_pending_actions("acme", "frontend").await.unwrap();
        assert!(actions.is_empty());
    }

    #[tokio::test]
    async fn listing_failure_is_fatal() {
        let (tracker, store) = setup();
        tracker.fail_on("list_issues_by_label");

        let result = store.find_pending_actions("acme", "frontend").await;
        assert!(matches!(result, Err(PendingError::ListFailed { .. })));
    }

    #[tokio::test]
    async fn comment_failure_drops_only_that_issue() {
        let (tracker, store) = setup();
        tracker.add_issue(issue(1, &[LABEL_PENDING_TRANSFER]));
        tracker.fail_on("list_comments");

        let actions = store.find_pending_actions("acme", "frontend").await.unwrap();
        assert!(actions.is_empty());
    }

    #[tokio::test]
    async fn cancel_removes_status_label() {
        let (tracker, store) = setup();
        tracker.add_issue(issue(1, &[LABEL_PENDING_CLOSE, "bug"]));
        let action = PendingAction::new(
            ActionType::Close,
            &issue(1, &[]),
            "https://github.com/acme/frontend/issues/3",
            4,
            24,
            Utc::now(),
        );

        store.cancel(&action).await.unwrap();

        let labels = tracker.issue("acme", "frontend", 1).unwrap().labels;
        assert_eq!(labels, vec!["bug".to_string()]);
    }

    #[tokio::test]
    async fn cancel_rejects_unknown_action_type() {
        let (tracker, store) = setup();
        tracker.add_issue(issue(1, &[]));
        let mut action =
            PendingAction::new(ActionType::Transfer, &issue(1, &[]), "acme/x", 1, 24, Utc::now());
        action.action_type = ActionType::Unknown;

        let result = store.cancel(&action).await;
        assert!(matches!(result, Err(PendingError::UnknownActionType { .. })));
    }
}
