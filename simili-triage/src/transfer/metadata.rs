//! Transfer-source marker embedded in the pre-transfer notice.
//!
//! The notice travels with the issue, so the destination copy can tell
//! where it came from when someone asks to move it back.

use crate::issue::{Issue, RepoRef};
use crate::pending::escape_comment_json;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Prefix of the HTML comment naming the pre-transfer repository.
pub const TRANSFER_SOURCE_MARKER: &str = "<!-- simili-transfer-source:";

static SOURCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!-- simili-transfer-source: (\{.*?\}) -->")
        .expect("transfer-source pattern is valid")
});

/// Repository an issue was transferred out of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferSourceMetadata {
    /// Owner of the source repository.
    pub org: String,

    /// Source repository name.
    pub repo: String,
}

impl TransferSourceMetadata {
    /// Metadata naming the repository `issue` currently lives in.
    #[must_use]
    pub fn from_issue(issue: &Issue) -> Self {
        Self {
            org: issue.org.clone(),
            repo: issue.repo.clone(),
        }
    }

    /// Source repository as a [`RepoRef`].
    #[must_use]
    pub fn repo_ref(&self) -> RepoRef {
        RepoRef::new(self.org.clone(), self.repo.clone())
    }

    /// Renders the HTML-comment marker.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_marker(&self) -> Result<String, serde_json::Error> {
        let json = escape_comment_json(&serde_json::to_string(self)?);
        Ok(format!("{TRANSFER_SOURCE_MARKER} {json} -->"))
    }

    /// Decodes the first transfer-source marker in `body`.
    ///
    /// Returns `None` when there is no marker or its JSON is malformed.
    #[must_use]
    pub fn parse(body: &str) -> Option<Self> {
        let json = SOURCE_RE.captures(body)?.get(1)?.as_str();
        serde_json::from_str(json).ok()
    }
}
