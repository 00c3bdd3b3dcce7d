//! Per-repository settings and transfer rules.

use serde::Deserialize;

/// A repository this tool triages, and a candidate destination for routing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RepositoryConfig {
    /// Repository owner.
    pub org: String,

    /// Repository name.
    pub repo: String,

    /// Whether the repository takes part in triage and routing.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// What belongs in this repository; shown to the AI router.
    #[serde(default)]
    pub description: String,

    /// Ordered transfer rules; the first full match wins.
    #[serde(default)]
    pub transfer_rules: Vec<TransferRule>,
}

fn default_enabled() -> bool {
    true
}

/// A deterministic routing rule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TransferRule {
    /// Destination repository in `org/repo` form.
    pub target: String,

    /// Predicate the issue has to satisfy.
    #[serde(rename = "match", default)]
    pub predicate: RuleMatch,
}

/// Match predicate of a [`TransferRule`].
///
/// Each present field must hold; an empty field does not constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuleMatch {
    /// Labels that must all be present on the issue.
    #[serde(default)]
    pub labels: Vec<String>,

    /// Title must contain at least one of these (case-insensitive).
    #[serde(default)]
    pub title_contains: Vec<String>,

    /// Body must contain at least one of these (case-insensitive).
    #[serde(default)]
    pub body_contains: Vec<String>,

    /// Exact author login.
    #[serde(default)]
    pub author: Option<String>,
}

impl RuleMatch {
    /// Returns true if no field constrains the match.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
            && self.title_contains.is_empty()
            && self.body_contains.is_empty()
            && self.author.as_deref().map_or(true, str::is_empty)
    }

    /// Human-readable description used in transfer notices.
    ///
    /// Format: `` `labels: [a, b]` + `title_contains: [x]` ``.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if !self.labels.is_empty() {
            parts.push(format!("`labels: [{}]`", self.labels.join(", ")));
        }
        if !self.title_contains.is_empty() {
            parts.push(format!(
                "`title_contains: [{}]`",
                self.title_contains.join(", ")
            ));
        }
        if !self.body_contains.is_empty() {
            parts.push(format!(
                "`body_contains: [{}]`",
                self.body_contains.join(", ")
            ));
        }
        if let Some(author) = self.author.as_deref().filter(|a| !a.is_empty()) {
            parts.push(format!("`author: {author}`"));
        }

        if parts.is_empty() {
            "routing rules".to_string()
        } else {
            parts.join(" + ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_every_present_field() {
        let predicate = RuleMatch {
            labels: vec!["bug-ui".to_string(), "frontend".to_string()],
            title_contains: vec!["button".to_string()],
            body_contains: Vec::new(),
            author: Some("octocat".to_string()),
        };

        assert_eq!(
            predicate.describe(),
            "`labels: [bug-ui, frontend]` + `title_contains: [button]` + `author: octocat`"
        );
    }

    #[test]
    fn empty_predicate_describes_as_routing_rules() {
        let predicate = RuleMatch::default();
        assert!(predicate.is_empty());
        assert_eq!(predicate.describe(), "routing rules");
    }
}
