//! Issue tracker collaborator.
//!
//! Every piece of workflow state lives in the tracker: labels make pending
//! issues discoverable, comments carry their payload. The [`Tracker`] trait
//! is the only way this crate reads or writes that state.
//!
//! Two handles are used at runtime: an elevated one for the privileged
//! transfer and a bot one for everything users see.

mod error;
pub mod github;
pub mod memory;
pub mod rate_limit;

pub use error::TrackerError;
pub use github::GitHubTracker;
pub use memory::InMemoryTracker;

use crate::issue::{Issue, IssueComment, IssueLocation, Reaction, RepoRef};
use async_trait::async_trait;

/// Outcome of reading the reactions on a pending-action comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionDecision {
    /// Someone left the approve reaction (and nobody cancelled).
    Approve,

    /// Someone left the cancel reaction.
    Cancel,

    /// Neither reaction is present.
    None,
}

/// Operations this crate needs from an issue tracker.
#[async_trait]
pub trait Tracker: Send + Sync {
    /// Fetches an issue. Transferred issues resolve to their new location.
    async fn get_issue(&self, org: &str, repo: &str, number: u64) -> Result<Issue, TrackerError>;

    /// Lists open issues carrying `label`.
    async fn list_issues_by_label(
        &self,
        org: &str,
        repo: &str,
        label: &str,
    ) -> Result<Vec<Issue>, TrackerError>;

    /// Lists every comment on an issue, oldest first.
    async fn list_comments(
        &self,
        org: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<IssueComment>, TrackerError>;

    /// Posts a comment and returns its id.
    async fn post_comment(
        &self,
        org: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<u64, TrackerError>;

    /// Adds labels to an issue.
    async fn add_labels(
        &self,
        org: &str,
        repo: &str,
        number: u64,
        labels: &[String],
    ) -> Result<(), TrackerError>;

    /// Removes a label from an issue. A label that is not present is not an error.
    async fn remove_label(
        &self,
        org: &str,
        repo: &str,
        number: u64,
        label: &str,
    ) -> Result<(), TrackerError>;

    /// Returns whether a repository exists and is visible to this identity.
    async fn repo_exists(&self, org: &str, repo: &str) -> Result<bool, TrackerError>;

    /// Moves an issue to `target` and returns where it landed.
    async fn transfer_issue(
        &self,
        issue: &Issue,
        target: &RepoRef,
    ) -> Result<IssueLocation, TrackerError>;

    /// Closes an issue as a duplicate.
    async fn close_issue(&self, org: &str, repo: &str, number: u64) -> Result<(), TrackerError>;

    /// Lists reactions on an issue comment.
    async fn list_comment_reactions(
        &self,
        org: &str,
        repo: &str,
        comment_id: u64,
    ) -> Result<Vec<Reaction>, TrackerError>;

    /// Returns true if the issue no longer lives where `issue` says it does.
    async fn was_already_transferred(&self, issue: &Issue) -> Result<bool, TrackerError>;

    /// Returns true if anyone left `content` on the comment.
    async fn has_reaction(
        &self,
        org: &str,
        repo: &str,
        comment_id: u64,
        content: &str,
    ) -> Result<bool, TrackerError> {
        let reactions = self.list_comment_reactions(org, repo, comment_id).await?;
        Ok(reactions.iter().any(|r| r.content == content))
    }

    /// Reads the approve/cancel verdict on a comment. Cancel wins.
    async fn reaction_decision(
        &self,
        org: &str,
        repo: &str,
        comment_id: u64,
        approve: &str,
        cancel: &str,
    ) -> Result<ReactionDecision, TrackerError> {
        let reactions = self.list_comment_reactions(org, repo, comment_id).await?;
        Ok(decide(&reactions, approve, cancel))
    }
}

/// Cancel wins over approve.
fn decide(reactions: &[Reaction], approve: &str, cancel: &str) -> ReactionDecision {
    if reactions.iter().any(|r| r.content == cancel) {
        ReactionDecision::Cancel
    } else if reactions.iter().any(|r| r.content == approve) {
        ReactionDecision::Approve
    } else {
        ReactionDecision::None
    }
}
