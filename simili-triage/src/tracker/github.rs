//! GitHub implementation of [`Tracker`] backed by octocrab.
//!
//! REST covers issues, comments, labels and reactions. Transfers only exist
//! in the GraphQL API, so `transferIssue` is sent as a raw mutation.

use crate::issue::{Issue, IssueComment, IssueLocation, Reaction, RepoRef};
use crate::tracker::rate_limit::{ensure_core_rate_limit, ensure_graphql_rate_limit};
use crate::tracker::{Tracker, TrackerError};
use async_trait::async_trait;
use octocrab::models::issues::IssueStateReason;
use octocrab::models::reactions::ReactionContent;
use octocrab::models::IssueState;
use octocrab::{params, Octocrab};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use url::Url;

const TRANSFER_MUTATION: &str = "mutation($issueId: ID!, $repositoryId: ID!) {
  transferIssue(input: {issueId: $issueId, repositoryId: $repositoryId}) {
    issue { number repository { nameWithOwner } }
  }
}";

/// Tracker that talks to GitHub with a single identity.
#[derive(Clone)]
pub struct GitHubTracker {
    octocrab: Octocrab,
}

impl GitHubTracker {
    /// Builds a tracker authenticated with a personal or app token.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::GitHubError`] if the client cannot be built.
    pub fn new(token: &str) -> Result<Self, TrackerError> {
        let octocrab = Octocrab::builder()
            .personal_token(token.to_string())
            .build()?;
        Ok(Self { octocrab })
    }

    /// Wraps an existing client.
    #[must_use]
    pub fn from_client(octocrab: Octocrab) -> Self {
        Self { octocrab }
    }

    async fn fetch_raw_issue(
        &self,
        org: &str,
        repo: &str,
        number: u64,
    ) -> Result<octocrab::models::issues::Issue, TrackerError> {
        ensure_core_rate_limit(&self.octocrab).await?;
        let issue = self.octocrab.issues(org, repo).get(number).await?;
        Ok(issue)
    }
}

#[async_trait]
impl Tracker for GitHubTracker {
    async fn get_issue(&self, org: &str, repo: &str, number: u64) -> Result<Issue, TrackerError> {
        let raw = self.fetch_raw_issue(org, repo, number).await?;
        Ok(convert_issue(raw, org, repo))
    }

    async fn list_issues_by_label(
        &self,
        org: &str,
        repo: &str,
        label: &str,
    ) -> Result<Vec<Issue>, TrackerError> {
        ensure_core_rate_limit(&self.octocrab).await?;
        let labels = vec![label.to_string()];
        let page = self
            .octocrab
            .issues(org, repo)
            .list()
            .labels(&labels)
            .state(params::State::Open)
            .per_page(100)
            .send()
            .await?;
        let issues = self.octocrab.all_pages(page).await?;

        Ok(issues
            .into_iter()
            .filter(|i| i.pull_request.is_none())
            .map(|i| convert_issue(i, org, repo))
            .collect())
    }

    async fn list_comments(
        &self,
        org: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<IssueComment>, TrackerError> {
        ensure_core_rate_limit(&self.octocrab).await?;
        let page = self
            .octocrab
            .issues(org, repo)
            .list_comments(number)
            .per_page(100)
            .send()
            .await?;
        let comments = self.octocrab.all_pages(page).await?;

        Ok(comments
            .into_iter()
            .map(|c| IssueComment {
                id: c.id.into_inner(),
                body: c.body.unwrap_or_default(),
                author: c.user.login,
                created_at: c.created_at,
            })
            .collect())
    }

    async fn post_comment(
        &self,
        org: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<u64, TrackerError> {
        let comment = self
            .octocrab
            .issues(org, repo)
            .create_comment(number, body)
            .await?;
        debug!(comment_id = %comment.id, "Posted comment");
        Ok(comment.id.into_inner())
    }

    async fn add_labels(
        &self,
        org: &str,
        repo: &str,
        number: u64,
        labels: &[String],
    ) -> Result<(), TrackerError> {
        self.octocrab
            .issues(org, repo)
            .add_labels(number, labels)
            .await?;
        Ok(())
    }

    async fn remove_label(
        &self,
        org: &str,
        repo: &str,
        number: u64,
        label: &str,
    ) -> Result<(), TrackerError> {
        match self
            .octocrab
            .issues(org, repo)
            .remove_label(number, label)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                let error = TrackerError::from(e);
                if error.is_not_found() {
                    debug!(label, "Label already absent");
                    Ok(())
                } else {
                    Err(error)
                }
            }
        }
    }

    async fn repo_exists(&self, org: &str, repo: &str) -> Result<bool, TrackerError> {
        ensure_core_rate_limit(&self.octocrab).await?;
        match self.octocrab.repos(org, repo).get().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let error = TrackerError::from(e);
                if error.is_not_found() {
                    Ok(false)
                } else {
                    Err(error)
                }
            }
        }
    }

    async fn transfer_issue(
        &self,
        issue: &Issue,
        target: &RepoRef,
    ) -> Result<IssueLocation, TrackerError> {
        let raw = self
            .fetch_raw_issue(&issue.org, &issue.repo, issue.number)
            .await?;
        let repository = self.octocrab.repos(&target.org, &target.repo).get().await?;
        let repository_id = repository.node_id.ok_or_else(|| TrackerError::NotFound {
            resource: format!("node id of {target}"),
        })?;

        ensure_graphql_rate_limit(&self.octocrab).await?;
        let payload = json!({
            "query": TRANSFER_MUTATION,
            "variables": { "issueId": raw.node_id, "repositoryId": repository_id },
        });
        let response: GraphQlResponse<TransferData> = self.octocrab.graphql(&payload).await?;

        let moved = parse_transfer_response(response)?;
        let destination = RepoRef::parse(&moved.repository.name_with_owner).map_err(|e| {
            TrackerError::UnexpectedResponse {
                operation: "transferIssue".to_string(),
                message: e.to_string(),
            }
        })?;

        Ok(IssueLocation {
            org: destination.org,
            repo: destination.repo,
            number: moved.number,
        })
    }

    async fn close_issue(&self, org: &str, repo: &str, number: u64) -> Result<(), TrackerError> {
        self.octocrab
            .issues(org, repo)
            .update(number)
            .state(IssueState::Closed)
            .state_reason(IssueStateReason::Duplicate)
            .send()
            .await?;
        Ok(())
    }

    async fn list_comment_reactions(
        &self,
        org: &str,
        repo: &str,
        comment_id: u64,
    ) -> Result<Vec<Reaction>, TrackerError> {
        ensure_core_rate_limit(&self.octocrab).await?;
        let page = self
            .octocrab
            .issues(org, repo)
            .list_comment_reactions(comment_id)
            .per_page(100)
            .send()
            .await?;
        let reactions = self.octocrab.all_pages(page).await?;

        Ok(reactions
            .into_iter()
            .map(|r| Reaction {
                content: reaction_content(&r.content),
                user: r.user.login,
            })
            .collect())
    }

    async fn was_already_transferred(&self, issue: &Issue) -> Result<bool, TrackerError> {
        // GitHub redirects a moved issue, so the old URL answers with the new repository.
        let raw = self
            .fetch_raw_issue(&issue.org, &issue.repo, issue.number)
            .await?;
        let moved = match repo_from_api_url(&raw.repository_url) {
            Some((org, repo)) => {
                !(org.eq_ignore_ascii_case(&issue.org) && repo.eq_ignore_ascii_case(&issue.repo))
            }
            None => false,
        };
        Ok(moved)
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransferData {
    transfer_issue: Option<TransferPayload>,
}

#[derive(Debug, Deserialize)]
struct TransferPayload {
    issue: TransferredIssue,
}

#[derive(Debug, Deserialize)]
struct TransferredIssue {
    number: u64,
    repository: TransferredRepository,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransferredRepository {
    name_with_owner: String,
}

fn parse_transfer_response(
    response: GraphQlResponse<TransferData>,
) -> Result<TransferredIssue, TrackerError> {
    if !response.errors.is_empty() {
        let message = response
            .errors
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(TrackerError::GraphQl { message });
    }

    response
        .data
        .and_then(|d| d.transfer_issue)
        .map(|p| p.issue)
        .ok_or_else(|| TrackerError::UnexpectedResponse {
            operation: "transferIssue".to_string(),
            message: "response carried no issue".to_string(),
        })
}

/// Converts an octocrab issue, taking org/repo from where it actually lives.
fn convert_issue(raw: octocrab::models::issues::Issue, org: &str, repo: &str) -> Issue {
    let (org, repo) = repo_from_api_url(&raw.repository_url)
        .unwrap_or_else(|| (org.to_string(), repo.to_string()));
    Issue {
        org,
        repo,
        number: raw.number,
        title: raw.title,
        body: raw.body.unwrap_or_default(),
        author: raw.user.login,
        labels: raw.labels.into_iter().map(|l| l.name).collect(),
    }
}

/// Extracts `(org, repo)` from `https://api.github.com/repos/{org}/{repo}`.
fn repo_from_api_url(url: &Url) -> Option<(String, String)> {
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [.., "repos", org, repo] => Some(((*org).to_string(), (*repo).to_string())),
        _ => None,
    }
}

/// GitHub's wire name for a reaction (`+1`, `-1`, `eyes`, ...).
fn reaction_content(content: &ReactionContent) -> String {
    match serde_json::to_value(content) {
        Ok(serde_json::Value::String(name)) => name,
        _ => format!("{content:?}").to_lowercase(),
    }
}
