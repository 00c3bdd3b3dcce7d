//! In-memory [`Tracker`] for tests and local experiments.
//!
//! Behaves like GitHub where this crate cares: transferred issues get a new
//! number in the destination and the old location resolves to the new one,
//! comments and labels move along, and removing an absent label succeeds.

use crate::issue::{Issue, IssueComment, IssueLocation, Reaction, RepoRef};
use crate::tracker::{Tracker, TrackerError};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

type IssueKey = (String, String, u64);

fn key(org: &str, repo: &str, number: u64) -> IssueKey {
    (org.to_lowercase(), repo.to_lowercase(), number)
}

fn repo_key(org: &str, repo: &str) -> (String, String) {
    (org.to_lowercase(), repo.to_lowercase())
}

#[derive(Debug, Clone)]
struct StoredIssue {
    issue: Issue,
    comments: Vec<IssueComment>,
    moved_to: Option<IssueKey>,
    closed: bool,
}

/// A transfer performed through the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    /// `org/repo#number` the issue left.
    pub from: IssueLocation,

    /// Where it landed.
    pub to: IssueLocation,
}

#[derive(Debug, Default)]
struct State {
    repositories: BTreeSet<(String, String)>,
    issues: BTreeMap<IssueKey, StoredIssue>,
    reactions: HashMap<u64, Vec<Reaction>>,
    next_comment_id: u64,
    transfers: Vec<TransferRecord>,
    failing: BTreeSet<String>,
}

impl State {
    /// Follows transfer redirects to the live copy.
    fn resolve(&self, org: &str, repo: &str, number: u64) -> Option<IssueKey> {
        let mut current = key(org, repo, number);
        for _ in 0..16 {
            let stored = self.issues.get(&current)?;
            match &stored.moved_to {
                Some(next) => current = next.clone(),
                None => return Some(current),
            }
        }
        None
    }

    fn live_mut(
        &mut self,
        org: &str,
        repo: &str,
        number: u64,
    ) -> Result<&mut StoredIssue, TrackerError> {
        let resolved = self
            .resolve(org, repo, number)
            .ok_or_else(|| not_found(org, repo, number))?;
        self.issues
            .get_mut(&resolved)
            .ok_or_else(|| not_found(org, repo, number))
    }

    fn check(&self, operation: &str) -> Result<(), TrackerError> {
        if self.failing.contains(operation) {
            return Err(TrackerError::Unavailable {
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    fn next_comment_id(&mut self) -> u64 {
        self.next_comment_id += 1;
        self.next_comment_id
    }

    fn next_issue_number(&self, org: &str, repo: &str) -> u64 {
        let (org, repo) = repo_key(org, repo);
        self.issues
            .keys()
            .filter(|(o, r, _)| *o == org && *r == repo)
            .map(|(_, _, n)| *n)
            .max()
            .unwrap_or(0)
            + 1
    }
}

fn not_found(org: &str, repo: &str, number: u64) -> TrackerError {
    TrackerError::NotFound {
        resource: format!("{org}/{repo}#{number}"),
    }
}

/// Tracker holding everything in process memory.
#[derive(Debug, Default)]
pub struct InMemoryTracker {
    state: Mutex<State>,
}

impl InMemoryTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a repository so that it exists for [`Tracker::repo_exists`].
    pub fn add_repository(&self, org: &str, repo: &str) {
        self.lock().repositories.insert(repo_key(org, repo));
    }

    /// Stores an issue (and its repository).
    pub fn add_issue(&self, issue: Issue) {
        let mut state = self.lock();
        state
            .repositories
            .insert(repo_key(&issue.org, &issue.repo));
        state.issues.insert(
            key(&issue.org, &issue.repo, issue.number),
            StoredIssue {
                issue,
                comments: Vec::new(),
                moved_to: None,
                closed: false,
            },
        );
    }

    /// Adds a comment as `author`, created `age` ago, and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::NotFound`] if the issue does not exist.
    pub fn add_comment(
        &self,
        org: &str,
        repo: &str,
        number: u64,
        author: &str,
        body: &str,
        age: Duration,
    ) -> Result<u64, TrackerError> {
        let mut state = self.lock();
        let id = state.next_comment_id();
        let stored = state.live_mut(org, repo, number)?;
        stored.comments.push(IssueComment {
            id,
            body: body.to_string(),
            author: author.to_string(),
            created_at: Utc::now() - age,
        });
        stored.comments.sort_by_key(|c| c.created_at);
        Ok(id)
    }

    /// Leaves a reaction on a comment.
    pub fn add_reaction(&self, comment_id: u64, content: &str, user: &str) {
        self.lock()
            .reactions
            .entry(comment_id)
            .or_default()
            .push(Reaction {
                content: content.to_string(),
                user: user.to_string(),
            });
    }

    /// Makes every call of `operation` (the trait method name) fail.
    pub fn fail_on(&self, operation: &str) {
        self.lock().failing.insert(operation.to_string());
    }

    /// Lets `operation` succeed again.
    pub fn recover(&self, operation: &str) {
        self.lock().failing.remove(operation);
    }

    /// Live copy of an issue, following transfers.
    #[must_use]
    pub fn issue(&self, org: &str, repo: &str, number: u64) -> Option<Issue> {
        let state = self.lock();
        let resolved = state.resolve(org, repo, number)?;
        state.issues.get(&resolved).map(|s| s.issue.clone())
    }

    /// Comments on the live copy of an issue, oldest first.
    #[must_use]
    pub fn comments(&self, org: &str, repo: &str, number: u64) -> Vec<IssueComment> {
        let state = self.lock();
        state
            .resolve(org, repo, number)
            .and_then(|k| state.issues.get(&k))
            .map(|s| s.comments.clone())
            .unwrap_or_default()
    }

    /// Every transfer performed so far, in order.
    #[must_use]
    pub fn transfers(&self) -> Vec<TransferRecord> {
        self.lock().transfers.clone()
    }

    /// Returns true if the live copy of the issue is closed.
    #[must_use]
    pub fn is_closed(&self, org: &str, repo: &str, number: u64) -> bool {
        let state = self.lock();
        state
            .resolve(org, repo, number)
            .and_then(|k| state.issues.get(&k))
            .is_some_and(|s| s.closed)
    }
}

#[async_trait]
impl Tracker for InMemoryTracker {
    async fn get_issue(&self, org: &str, repo: &str, number: u64) -> Result<Issue, TrackerError> {
        let mut state = self.lock();
        state.check("get_issue")?;
        Ok(state.live_mut(org, repo, number)?.issue.clone())
    }

    async fn list_issues_by_label(
        &self,
        org: &str,
        repo: &str,
        label: &str,
    ) -> Result<Vec<Issue>, TrackerError> {
        let state = self.lock();
        state.check("list_issues_by_label")?;
        let (org, repo) = repo_key(org, repo);
        Ok(state
            .issues
            .iter()
            .filter(|((o, r, _), s)| {
                *o == org && *r == repo && s.moved_to.is_none() && !s.closed
            })
            .filter(|(_, s)| s.issue.has_label(label))
            .map(|(_, s)| s.issue.clone())
            .collect())
    }

    async fn list_comments(
        &self,
        org: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<IssueComment>, TrackerError> {
        let mut state = self.lock();
        state.check("list_comments")?;
        Ok(state.live_mut(org, repo, number)?.comments.clone())
    }

    async fn post_comment(
        &self,
        org: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<u64, TrackerError> {
        let mut state = self.lock();
        state.check("post_comment")?;
        let id = state.next_comment_id();
        let stored = state.live_mut(org, repo, number)?;
        stored.comments.push(IssueComment {
            id,
            body: body.to_string(),
            author: "simili-bot".to_string(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn add_labels(
        &self,
        org: &str,
        repo: &str,
        number: u64,
        labels: &[String],
    ) -> Result<(), TrackerError> {
        let mut state = self.lock();
        state.check("add_labels")?;
        let stored = state.live_mut(org, repo, number)?;
        for label in labels {
            if !stored.issue.has_label(label) {
                stored.issue.labels.push(label.clone());
            }
        }
        Ok(())
    }

    async fn remove_label(
        &self,
        org: &str,
        repo: &str,
        number: u64,
        label: &str,
    ) -> Result<(), TrackerError> {
        let mut state = self.lock();
        state.check("remove_label")?;
        let stored = state.live_mut(org, repo, number)?;
        stored
            .issue
            .labels
            .retain(|l| !l.eq_ignore_ascii_case(label));
        Ok(())
    }

    async fn repo_exists(&self, org: &str, repo: &str) -> Result<bool, TrackerError> {
        let state = self.lock();
        state.check("repo_exists")?;
        Ok(state.repositories.contains(&repo_key(org, repo)))
    }

    async fn transfer_issue(
        &self,
        issue: &Issue,
        target: &RepoRef,
    ) -> Result<IssueLocation, TrackerError> {
        let mut state = self.lock();
        state.check("transfer_issue")?;
        if !state.repositories.contains(&repo_key(&target.org, &target.repo)) {
            return Err(TrackerError::NotFound {
                resource: target.to_string(),
            });
        }

        let source = state
            .resolve(&issue.org, &issue.repo, issue.number)
            .ok_or_else(|| not_found(&issue.org, &issue.repo, issue.number))?;
        let number = state.next_issue_number(&target.org, &target.repo);
        let destination = key(&target.org, &target.repo, number);

        let stored = state
            .issues
            .get_mut(&source)
            .ok_or_else(|| not_found(&issue.org, &issue.repo, issue.number))?;
        let from = IssueLocation {
            org: stored.issue.org.clone(),
            repo: stored.issue.repo.clone(),
            number: stored.issue.number,
        };
        let mut moved = stored.clone();
        stored.moved_to = Some(destination.clone());

        moved.issue.org = target.org.clone();
        moved.issue.repo = target.repo.clone();
        moved.issue.number = number;
        state.issues.insert(destination, moved);

        let to = IssueLocation {
            org: target.org.clone(),
            repo: target.repo.clone(),
            number,
        };
        state.transfers.push(TransferRecord {
            from,
            to: to.clone(),
        });
        Ok(to)
    }

    async fn close_issue(&self, org: &str, repo: &str, number: u64) -> Result<(), TrackerError> {
        let mut state = self.lock();
        state.check("close_issue")?;
        state.live_mut(org, repo, number)?.closed = true;
        Ok(())
    }

    async fn list_comment_reactions(
        &self,
        _org: &str,
        _repo: &str,
        comment_id: u64,
    ) -> Result<Vec<Reaction>, TrackerError> {
        let state = self.lock();
        state.check("list_comment_reactions")?;
        Ok(state.reactions.get(&comment_id).cloned().unwrap_or_default())
    }

    async fn was_already_transferred(&self, issue: &Issue) -> Result<bool, TrackerError> {
        let state = self.lock();
        state.check("was_already_transferred")?;
        let stored = state
            .issues
            .get(&key(&issue.org, &issue.repo, issue.number))
            .ok_or_else(|| not_found(&issue.org, &issue.repo, issue.number))?;
        Ok(stored.moved_to.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(org: &str, repo: &str, number: u64) -> Issue {
        Issue {
            org: org.to_string(),
            repo: repo.to_string(),
            number,
            title: "Crash on save".to_string(),
            body: String::new(),
            author: "octocat".to_string(),
            labels: vec!["bug".to_string()],
        }
    }

    #[tokio::test]
    async fn transfer_redirects_old_location() {
        let tracker = InMemoryTracker::new();
        tracker.add_repository("acme", "backend");
        tracker.add_issue(issue("acme", "frontend", 3));
        tracker
            .add_comment("acme", "frontend", 3, "octocat", "first", Duration::hours(1))
            .unwrap();

        let original = tracker.get_issue("acme", "frontend", 3).await.unwrap();
        let location = tracker
            .transfer_issue(&original, &RepoRef::new("acme", "backend"))
            .await
            .unwrap();

        assert_eq!(location.repo, "backend");
        assert_eq!(location.number, 1);
        assert!(tracker.was_already_transferred(&original).await.unwrap());

        let resolved = tracker.get_issue("acme", "frontend", 3).await.unwrap();
        assert_eq!(resolved.repo, "backend");
        assert_eq!(tracker.comments("acme", "backend", 1).len(), 1);
        assert_eq!(tracker.transfers().len(), 1);
    }

    #[tokio::test]
    async fn removing_absent_label_succeeds() {
        let tracker = InMemoryTracker::new();
        tracker.add_issue(issue("acme", "frontend", 1));

        tracker
            .remove_label("acme", "frontend", 1, "pending-transfer")
            .await
            .unwrap();
        tracker
            .remove_label("acme", "frontend", 1, "BUG")
            .await
            .unwrap();

        assert!(tracker.issue("acme", "frontend", 1).unwrap().labels.is_empty());
    }

    #[tokio::test]
    async fn injected_failures_surface_as_errors() {
        let tracker = InMemoryTracker::new();
        tracker.add_issue(issue("acme", "frontend", 1));
        tracker.fail_on("post_comment");

        let result = tracker.post_comment("acme", "frontend", 1, "hi").await;
        assert!(matches!(result, Err(TrackerError::Unavailable { .. })));

        tracker.recover("post_comment");
        assert!(tracker.post_comment("acme", "frontend", 1, "hi").await.is_ok());
    }

    #[tokio::test]
    async fn listing_by_label_skips_moved_and_closed_issues() {
        let tracker = InMemoryTracker::new();
        tracker.add_repository("acme", "backend");
        tracker.add_issue(issue("acme", "frontend", 1));
        tracker.add_issue(issue("acme", "frontend", 2));
        tracker.add_issue(issue("acme", "frontend", 3));

        let second = tracker.get_issue("acme", "frontend", 2).await.unwrap();
        tracker
            .transfer_issue(&second, &RepoRef::new("acme", "backend"))
            .await
            .unwrap();
        tracker.close_issue("acme", "frontend", 3).await.unwrap();

        let listed = tracker
            .list_issues_by_label("acme", "frontend", "bug")
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].number, 1);
    }
}
