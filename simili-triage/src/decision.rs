//! Deciding whether, and where, an issue should move.
//!
//! Rules are tried first; the AI router is the fallback. Nothing here
//! writes to the tracker.

use crate::config::{Config, TransferRule};
use crate::issue::Issue;
use crate::llm::LanguageModel;
use crate::pending::{ActionType, PendingAction};
use crate::tracker::Tracker;
use crate::transfer::{has_revert_marker, RuleMatcher};
use crate::triage::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};

/// Lowest router confidence accepted as a transfer target.
pub const MIN_ROUTER_CONFIDENCE: f64 = 0.8;

/// How many of the newest comments the loop guard inspects.
const RECENT_COMMENTS: usize = 5;

/// Where a resolved target came from.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetOrigin {
    /// A configured rule matched.
    Rule(TransferRule),

    /// The AI router suggested it.
    Router {
        /// Model confidence.
        confidence: f64,
        /// Model explanation.
        reason: String,
    },
}

/// A destination chosen for an issue.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTarget {
    /// Destination `org/repo`.
    pub repo: String,

    /// Rule or router.
    pub origin: TargetOrigin,
}

impl ResolvedTarget {
    /// The matched rule, if a rule produced this target.
    #[must_use]
    pub fn rule(&self) -> Option<&TransferRule> {
        match &self.origin {
            TargetOrigin::Rule(rule) => Some(rule),
            TargetOrigin::Router { .. } => None,
        }
    }

    /// Human-readable reason shown in pending notices.
    #[must_use]
    pub fn reason(&self) -> String {
        match &self.origin {
            TargetOrigin::Rule(rule) => rule.predicate.describe(),
            TargetOrigin::Router { confidence, reason } => {
                format!("AI routing ({:.0}% confidence): {reason}", confidence * 100.0)
            }
        }
    }
}

/// Result of evaluating an issue.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransferVerdict {
    /// Destination, if any.
    pub target: Option<ResolvedTarget>,

    /// Delayed transfer to schedule, when delayed actions are enabled.
    /// Its `comment_id` is filled in once the notice is posted.
    pub pending: Option<PendingAction>,
}

/// The "should this issue move" step.
pub struct TransferDecision<'a> {
    config: &'a Config,
    tracker: Arc<dyn Tracker>,
    model: Option<Arc<dyn LanguageModel>>,
}

impl<'a> TransferDecision<'a> {
    /// Creates the step. Without a model the AI fallback is skipped.
    pub fn new(
        config: &'a Config,
        tracker: Arc<dyn Tracker>,
        model: Option<Arc<dyn LanguageModel>>,
    ) -> Self {
        Self {
            config,
            tracker,
            model,
        }
    }

    /// Evaluates `issue` now.
    pub async fn evaluate(&self, issue: &Issue) -> TransferVerdict {
        self.evaluate_at(issue, Utc::now()).await
    }

    /// Evaluates `issue`, scheduling any pending action relative to `now`.
    pub async fn evaluate_at(&self, issue: &Issue, now: DateTime<Utc>) -> TransferVerdict {
        let span = info_span!(
            "transfer_check",
            org = %issue.org,
            repo = %issue.repo,
            issue_number = issue.number
        );

        async {
            let Some(target) = self.resolve_target(issue).await else {
                return TransferVerdict::default();
            };
            info!(target_repo = %target.repo, "Transfer target identified");

            let delayed = &self.config.defaults.delayed_actions;
            let pending = delayed.enabled.then(|| {
                let mut action = PendingAction::new(
                    ActionType::Transfer,
                    issue,
                    &target.repo,
                    0,
                    delayed.delay_hours,
                    now,
                );
                action
                    .metadata
                    .insert("reason".to_string(), target.reason());
                action
            });

            TransferVerdict {
                target: Some(target),
                pending,
            }
        }
        .instrument(span)
        .await
    }

    async fn resolve_target(&self, issue: &Issue) -> Option<ResolvedTarget> {
        let Some(repo_config) = self.config.repository(&issue.org, &issue.repo) else {
            debug!("Repository not configured");
            return None;
        };

        if self.was_reverted(issue).await {
            info!("Issue was recently reverted, skipping automatic transfer");
            return None;
        }

        if let Some(rule) = RuleMatcher::new(&repo_config.transfer_rules).find_match(issue) {
            return Some(ResolvedTarget {
                repo: rule.target.clone(),
                origin: TargetOrigin::Rule(rule.clone()),
            });
        }

        if !self.config.triage.router.enabled {
            return None;
        }
        let model = self.model.as_ref()?;

        let router = Router::new(Arc::clone(model), &self.config.repositories);
        match router.route(issue).await {
            Ok(Some(result)) => {
                if result.confidence < MIN_ROUTER_CONFIDENCE {
                    debug!(confidence = result.confidence, "AI routing below threshold");
                    return None;
                }
                if result.target_repo.eq_ignore_ascii_case(&issue.full_repo()) {
                    debug!("AI routing kept the issue in place");
                    return None;
                }
                info!(
                    target_repo = %result.target_repo,
                    confidence = result.confidence,
                    reason = %result.reason,
                    "AI router suggested transfer"
                );
                Some(ResolvedTarget {
                    repo: result.target_repo,
                    origin: TargetOrigin::Router {
                        confidence: result.confidence,
                        reason: result.reason,
                    },
                })
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "AI routing failed");
                None
            }
        }
    }

    /// Loop guard: revert marker in the body or the newest few comments.
    async fn was_reverted(&self, issue: &Issue) -> bool {
        if has_revert_marker(&issue.body) {
            return true;
        }

        match self
            .tracker
            .list_comments(&issue.org, &issue.repo, issue.number)
            .await
        {
            Ok(comments) => comments
                .iter()
                .rev()
                .take(RECENT_COMMENTS)
                .any(|c| has_revert_marker(&c.body)),
            Err(e) => {
                warn!(error = %e, "Failed to read comments for loop guard");
                false
            }
        }
    }
}
