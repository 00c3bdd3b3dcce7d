//! Deterministic rule matching.

use crate::config::{RuleMatch, TransferRule};
use crate::issue::Issue;

/// Evaluates a repository's transfer rules in configured order.
#[derive(Debug, Clone, Copy)]
pub struct RuleMatcher<'a> {
    rules: &'a [TransferRule],
}

impl<'a> RuleMatcher<'a> {
    /// Creates a matcher over `rules`.
    #[must_use]
    pub fn new(rules: &'a [TransferRule]) -> Self {
        Self { rules }
    }

    /// Returns the first rule whose whole predicate holds for `issue`.
    #[must_use]
    pub fn find_match(&self, issue: &Issue) -> Option<&'a TransferRule> {
        self.rules
            .iter()
            .find(|rule| predicate_holds(&rule.predicate, issue))
    }
}

/// Present fields are ANDed; absent ones don't constrain.
fn predicate_holds(predicate: &RuleMatch, issue: &Issue) -> bool {
    if predicate.is_empty() {
        return false;
    }

    let labels = predicate.labels.iter().all(|label| issue.has_label(label));
    let title = contains_any(&issue.title, &predicate.title_contains);
    let body = contains_any(&issue.body, &predicate.body_contains);
    let author = predicate
        .author
        .as_deref()
        .filter(|a| !a.is_empty())
        .map_or(true, |a| a == issue.author);

    labels && title && body && author
}

/// Case-insensitive substring test; an empty needle list always holds.
fn contains_any(haystack: &str, needles: &[String]) -> bool {
    if needles.is_empty() {
        return true;
    }
    let haystack = haystack.to_lowercase();
    needles
        .iter()
        .any(|needle| haystack.contains(&needle.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue() -> Issue {
        Issue {
            org: "acme".to_string(),
            repo: "frontend".to_string(),
            number: 7,
            title: "Button renders off-center".to_string(),
            body: "On Safari the primary BUTTON is misaligned.".to_string(),
            author: "octocat".to_string(),
            labels: vec!["Bug-UI".to_string(), "triage".to_string()],
        }
    }

    fn rule(target: &str, predicate: RuleMatch) -> TransferRule {
        TransferRule {
            target: target.to_string(),
            predicate,
        }
    }

    #[test]
    fn labels_must_all_be_present() {
        let rules = [
            rule(
                "acme/a",
                RuleMatch {
                    labels: vec!["bug-ui".to_string(), "backend".to_string()],
                    ..RuleMatch::default()
                },
            ),
            rule(
                "acme/b",
                RuleMatch {
                    labels: vec!["bug-ui".to_string(), "TRIAGE".to_string()],
                    ..RuleMatch::default()
                },
            ),
        ];

        let matched = RuleMatcher::new(&rules).find_match(&issue()).unwrap();
        assert_eq!(matched.target, "acme/b");
    }

    #[test]
    fn substrings_are_any_of_and_case_insensitive() {
        let rules = [rule(
            "acme/ui-kit",
            RuleMatch {
                title_contains: vec!["crash".to_string(), "RENDERS".to_string()],
                body_contains: vec!["button".to_string()],
                ..RuleMatch::default()
            },
        )];
        assert!(RuleMatcher::new(&rules).find_match(&issue()).is_some());
    }

    #[test]
    fn author_is_exact() {
        let exact = [rule(
            "acme/a",
            RuleMatch {
                author: Some("octocat".to_string()),
                ..RuleMatch::default()
            },
        )];
        let other = [rule(
            "acme/a",
            RuleMatch {
                author: Some("OctoCat".to_string()),
                ..RuleMatch::default()
            },
        )];

        assert!(RuleMatcher::new(&exact).find_match(&issue()).is_some());
        assert!(RuleMatcher::new(&other).find_match(&issue()).is_none());
    }

    #[test]
    fn first_full_match_wins() {
        let labels = RuleMatch {
            labels: vec!["triage".to_string()],
            ..RuleMatch::default()
        };
        let rules = [
            rule(
                "acme/never",
                RuleMatch {
                    labels: vec!["triage".to_string()],
                    title_contains: vec!["database".to_string()],
                    ..RuleMatch::default()
                },
            ),
            rule("acme/first", labels.clone()),
            rule("acme/second", labels),
        ];

        let matched = RuleMatcher::new(&rules).find_match(&issue()).unwrap();
        assert_eq!(matched.target, "acme/first");
    }

    #[test]
    fn empty_predicate_and_empty_rules_never_match() {
        let rules = [rule("acme/a", RuleMatch::default())];
        assert!(RuleMatcher::new(&rules).find_match(&issue()).is_none());
        assert!(RuleMatcher::new(&[]).find_match(&issue()).is_none());
    }
}
