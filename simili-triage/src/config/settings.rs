//! Top-level `simili.toml` structure, loading and validation.

use crate::config::{ConfigError, Defaults, RepositoryConfig, TriageConfig, VectorIndexConfig};
use crate::issue::RepoRef;
use crate::llm::LlmConfig;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;
use url::Url;

/// Parsed `simili.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Triage settings.
    #[serde(default)]
    pub triage: TriageConfig,

    /// Repositories under triage.
    #[serde(default)]
    pub repositories: Vec<RepositoryConfig>,

    /// Similarity index; entries are not cleaned up when absent.
    #[serde(default)]
    pub vector_index: Option<VectorIndexConfig>,

    /// Language model used by the AI router.
    #[serde(default)]
    pub llm: Option<LlmConfig>,
}

impl Config {
    /// Loads and validates a config file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to `simili.toml`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file is missing, unreadable, malformed or
    /// fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "Loading config");

        if !path.exists() {
            return Err(ConfigError::MissingFile {
                path: path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_toml(&contents, &path.display().to_string())
    }

    /// Parses and validates config from a TOML string.
    ///
    /// `origin` names the source in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::TomlError`] on malformed TOML and
    /// [`ConfigError::ValidationError`] on invalid settings.
    pub fn from_toml(contents: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents).map_err(|e| ConfigError::TomlError {
            path: origin.to_string(),
            source: e,
        })?;
        config.validate(origin)?;
        Ok(config)
    }

    /// Validates settings that deserialization cannot check.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] describing the first problem found.
    pub fn validate(&self, origin: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::ValidationError {
            path: origin.to_string(),
            message,
        };

        let delayed = &self.defaults.delayed_actions;
        if delayed.enabled && delayed.delay_hours == 0 {
            return Err(invalid(
                "delay-hours must be greater than zero when delayed actions are enabled"
                    .to_string(),
            ));
        }
        if delayed.approve_reaction.trim().is_empty() {
            return Err(invalid("approve-reaction cannot be empty".to_string()));
        }
        if delayed.cancel_reaction.trim().is_empty() {
            return Err(invalid("cancel-reaction cannot be empty".to_string()));
        }

        for repository in &self.repositories {
            if repository.org.trim().is_empty() || repository.repo.trim().is_empty() {
                return Err(invalid(
                    "every repository needs both org and repo".to_string(),
                ));
            }

            for rule in &repository.transfer_rules {
                if RepoRef::parse(&rule.target).is_err() {
                    return Err(invalid(format!(
                        "transfer rule target '{}' in {}/{} is not in 'org/repo' form",
                        rule.target, repository.org, repository.repo
                    )));
                }
                if rule.predicate.is_empty() {
                    return Err(invalid(format!(
                        "transfer rule to '{}' in {}/{} has no match condition",
                        rule.target, repository.org, repository.repo
                    )));
                }
            }
        }

        if let Some(index) = &self.vector_index {
            Url::parse(&index.url).map_err(|e| {
                invalid(format!("vector-index url '{}' is invalid: {e}", index.url))
            })?;
        }

        Ok(())
    }

    /// Looks up a repository by owner and name (case-insensitive).
    #[must_use]
    pub fn repository(&self, org: &str, repo: &str) -> Option<&RepositoryConfig> {
        self.repositories
            .iter()
            .find(|r| r.org.eq_ignore_ascii_case(org) && r.repo.eq_ignore_ascii_case(repo))
    }
}
