//! Issue, comment and repository reference types.
//!
//! These mirror what the tracker returns; nothing in this crate mutates an
//! [`Issue`] locally; every decision re-reads it from the tracker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Error returned when a repository reference is not in `org/repo` form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid repository '{value}': expected 'org/repo'")]
pub struct InvalidRepoRef {
    /// The rejected input.
    pub value: String,
}

/// A repository identified by owner and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    /// Owner (user or organization).
    pub org: String,

    /// Repository name.
    pub repo: String,
}

impl RepoRef {
    /// Creates a reference from its parts.
    pub fn new(org: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            org: org.into(),
            repo: repo.into(),
        }
    }

    /// Parses an `org/repo` string.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRepoRef`] unless the input has exactly one `/` with a
    /// non-empty part on each side.
    pub fn parse(value: &str) -> Result<Self, InvalidRepoRef> {
        let trimmed = value.trim();
        let invalid = || InvalidRepoRef {
            value: value.to_string(),
        };
        let (org, repo) = trimmed.split_once('/').ok_or_else(invalid)?;
        if org.is_empty() || repo.is_empty() || repo.contains('/') {
            return Err(invalid());
        }
        Ok(Self::new(org, repo))
    }

    /// Case-insensitive comparison, as GitHub treats owner and name.
    #[must_use]
    pub fn same_as(&self, org: &str, repo: &str) -> bool {
        self.org.eq_ignore_ascii_case(org) && self.repo.eq_ignore_ascii_case(repo)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.org, self.repo)
    }
}

/// Where an issue lives after a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueLocation {
    /// Owner of the repository holding the issue.
    pub org: String,

    /// Repository holding the issue.
    pub repo: String,

    /// Issue number in that repository.
    pub number: u64,
}

/// An issue as read from the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// Repository owner.
    pub org: String,

    /// Repository name.
    pub repo: String,

    /// Issue number.
    pub number: u64,

    /// Issue title.
    pub title: String,

    /// Issue body (empty when the issue has none).
    pub body: String,

    /// Login of the issue author.
    pub author: String,

    /// Names of the labels currently on the issue.
    pub labels: Vec<String>,
}

impl Issue {
    /// Returns `org/repo` for the issue's current repository.
    #[must_use]
    pub fn full_repo(&self) -> String {
        format!("{}/{}", self.org, self.repo)
    }

    /// Returns true if the issue carries `label` (case-insensitive).
    #[must_use]
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l.eq_ignore_ascii_case(label))
    }

    /// Stable key of this issue in the similarity index.
    ///
    /// A UUIDv5 over the issue URL, so the same issue always maps to the same
    /// point regardless of title or body edits.
    #[must_use]
    pub fn index_key(&self) -> String {
        let url = format!(
            "https://github.com/{}/{}/issues/{}",
            self.org.to_lowercase(),
            self.repo.to_lowercase(),
            self.number
        );
        Uuid::new_v5(&Uuid::NAMESPACE_URL, url.as_bytes()).to_string()
    }
}

/// A comment on an issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueComment {
    /// Comment id.
    pub id: u64,

    /// Markdown body.
    pub body: String,

    /// Login of the comment author.
    pub author: String,

    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A reaction left on a comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    /// Reaction content as GitHub names it (`+1`, `-1`, `eyes`, ...).
    pub content: String,

    /// Login of the reacting user.
    pub user: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_issue() -> Issue {
        Issue {
            org: "Acme".to_string(),
            repo: "Frontend".to_string(),
            number: 42,
            title: "Button misaligned".to_string(),
            body: String::new(),
            author: "octocat".to_string(),
            labels: vec!["Bug-UI".to_string()],
        }
    }

    #[test]
    fn parses_repo_ref() {
        let parsed = RepoRef::parse("acme/backend").unwrap();
        assert_eq!(parsed, RepoRef::new("acme", "backend"));
        assert_eq!(parsed.to_string(), "acme/backend");
    }

    #[test]
    fn rejects_malformed_repo_refs() {
        for value in ["", "acme", "acme/", "/backend", "acme/backend/extra"] {
            assert!(RepoRef::parse(value).is_err(), "{value} should be rejected");
        }
    }

    #[test]
    fn repo_ref_comparison_ignores_case() {
        let parsed = RepoRef::parse("Acme/Backend").unwrap();
        assert!(parsed.same_as("acme", "backend"));
        assert!(!parsed.same_as("acme", "frontend"));
    }

    #[test]
    fn label_lookup_ignores_case() {
        let issue = sample_issue();
        assert!(issue.has_label("bug-ui"));
        assert!(!issue.has_label("pending-transfer"));
    }

    #[test]
    fn index_key_is_stable_across_edits_and_case() {
        let issue = sample_issue();
        let mut edited = issue.clone();
        edited.title = "Different title".to_string();
        edited.org = "acme".to_string();
        edited.repo = "frontend".to_string();

        assert_eq!(issue.index_key(), edited.index_key());

        let mut other = issue.clone();
        other.number = 43;
        assert_ne!(issue.index_key(), other.index_key());
    }
}
