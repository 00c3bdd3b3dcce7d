//! The pending action payload and its embedded-comment encoding.

use crate::issue::Issue;
use crate::pending::PendingError;
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Prefix of the HTML comment carrying a pending action.
pub const PENDING_ACTION_MARKER: &str = "<!-- simili-pending-action:";

static METADATA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!-- simili-pending-action: (\{.*?\}) -->")
        .expect("pending-action pattern is valid")
});

/// What a pending action will do once it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    /// Move the issue to `target` (`org/repo`).
    Transfer,

    /// Close the issue as a duplicate of `target` (an issue URL).
    Close,

    /// Anything this version does not understand.
    #[serde(other)]
    Unknown,
}

impl ActionType {
    /// Status label marking an issue with a live action of this type.
    #[must_use]
    pub fn label(self) -> Option<&'static str> {
        match self {
            Self::Transfer => Some(crate::pending::LABEL_PENDING_TRANSFER),
            Self::Close => Some(crate::pending::LABEL_PENDING_CLOSE),
            Self::Unknown => None,
        }
    }

    /// Lower-case name used in comments and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transfer => "transfer",
            Self::Close => "close",
            Self::Unknown => "unknown",
        }
    }
}

/// A scheduled transfer or close, persisted as JSON inside an issue comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    /// Action type.
    #[serde(rename = "type")]
    pub action_type: ActionType,

    /// Owner of the repository holding the issue.
    pub org: String,

    /// Repository holding the issue.
    pub repo: String,

    /// Issue number.
    pub issue_number: u64,

    /// Destination `org/repo` for a transfer, original issue URL for a close.
    pub target: String,

    /// Comment whose reactions approve or cancel the action.
    pub comment_id: u64,

    /// When the action was scheduled.
    pub scheduled_at: DateTime<Utc>,

    /// When the action fires without approval.
    pub expires_at: DateTime<Utc>,

    /// Free-form extra data.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl PendingAction {
    /// Builds an action for `issue` expiring `delay_hours` after `now`.
    #[must_use]
    pub fn new(
        action_type: ActionType,
        issue: &Issue,
        target: &str,
        comment_id: u64,
        delay_hours: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            action_type,
            org: issue.org.clone(),
            repo: issue.repo.clone(),
            issue_number: issue.number,
            target: target.to_string(),
            comment_id,
            scheduled_at: now,
            expires_at: now + Duration::hours(i64::from(delay_hours)),
            metadata: BTreeMap::new(),
        }
    }

    /// True once the current time is past `expires_at`.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// True if `now` is strictly after `expires_at`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Serializes an action into its HTML-comment marker.
///
/// # Errors
///
/// Returns [`PendingError::InvalidMetadata`] if serialization fails.
pub fn format_pending_action_metadata(action: &PendingAction) -> Result<String, PendingError> {
    let json = escape_comment_json(&serde_json::to_string(action)?);
    Ok(format!("{PENDING_ACTION_MARKER} {json} -->"))
}

/// Escapes `<` and `>` in serialized JSON so free text can never close the
/// surrounding HTML comment. JSON decoders read the escapes back unchanged.
pub(crate) fn escape_comment_json(json: &str) -> String {
    json.replace('<', "\\u003c").replace('>', "\\u003e")
}

/// Decodes the first pending-action marker found in `body`.
///
/// # Errors
///
/// Returns [`PendingError::MetadataNotFound`] when there is no marker and
/// [`PendingError::InvalidMetadata`] when its JSON does not decode.
pub fn parse_pending_action_metadata(body: &str) -> Result<PendingAction, PendingError> {
    let captures = METADATA_RE
        .captures(body)
        .ok_or(PendingError::MetadataNotFound)?;
    let json = captures
        .get(1)
        .ok_or(PendingError::MetadataNotFound)?
        .as_str();
    Ok(serde_json::from_str(json)?)
}
