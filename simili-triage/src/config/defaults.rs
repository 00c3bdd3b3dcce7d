//! Global defaults: delayed actions, AI routing and the similarity index.

use serde::Deserialize;

/// `[defaults]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Defaults {
    /// Delayed-action policy.
    #[serde(default)]
    pub delayed_actions: DelayedActionsConfig,
}

/// `[defaults.delayed-actions]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DelayedActionsConfig {
    /// Hold resolved actions until expiry instead of executing them at once.
    #[serde(default)]
    pub enabled: bool,

    /// Hours between scheduling and expiry.
    #[serde(default = "default_delay_hours")]
    pub delay_hours: u32,

    /// Transfer immediately and allow a later revert via reaction.
    #[serde(default)]
    pub optimistic_transfers: bool,

    /// Reaction that approves a pending action before expiry.
    #[serde(default = "default_approve_reaction")]
    pub approve_reaction: String,

    /// Reaction that cancels a pending action, or reverts an optimistic transfer.
    #[serde(default = "default_cancel_reaction")]
    pub cancel_reaction: String,
}

impl Default for DelayedActionsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            delay_hours: default_delay_hours(),
            optimistic_transfers: false,
            approve_reaction: default_approve_reaction(),
            cancel_reaction: default_cancel_reaction(),
        }
    }
}

pub(crate) fn default_delay_hours() -> u32 {
    24
}

pub(crate) fn default_approve_reaction() -> String {
    "+1".to_string()
}

pub(crate) fn default_cancel_reaction() -> String {
    "-1".to_string()
}

/// `[triage]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TriageConfig {
    /// AI routing settings.
    #[serde(default)]
    pub router: RouterConfig,
}

/// `[triage.router]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RouterConfig {
    /// Fall back to the language model when no rule matches.
    #[serde(default)]
    pub enabled: bool,
}

/// `[vector-index]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VectorIndexConfig {
    /// Base URL of the Qdrant REST API.
    pub url: String,

    /// API key (optional, falls back to QDRANT_API_KEY env var).
    #[serde(default)]
    pub api_key: Option<String>,

    /// Prefix of the per-organization collection names.
    #[serde(default = "default_collection_prefix")]
    pub collection_prefix: String,
}

pub(crate) fn default_collection_prefix() -> String {
    "simili".to_string()
}
