//! Runner configuration.

use std::path::{Path, PathBuf};

/// Default location of the triage configuration.
pub const DEFAULT_CONFIG_PATH: &str = "simili.toml";

/// Configuration for building a [`Runner`](crate::runner::Runner).
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Path to `simili.toml`.
    config_path: PathBuf,
    /// Bot token used for reads and comments.
    token: String,
    /// Elevated token used for transfers; the bot token when absent.
    transfer_token: Option<String>,
    /// Similarity-index API key overriding the config file.
    index_api_key: Option<String>,
    /// Whether to preview changes without writing.
    dry_run: bool,
}

impl RunnerConfig {
    /// Creates a new configuration for a run.
    pub fn new(config_path: PathBuf, token: String, dry_run: bool) -> Self {
        Self {
            config_path,
            token,
            transfer_token: None,
            index_api_key: None,
            dry_run,
        }
    }

    /// Sets the elevated token used for transfers.
    #[must_use]
    pub fn with_transfer_token(mut self, transfer_token: Option<String>) -> Self {
        self.transfer_token = transfer_token.filter(|t| !t.is_empty());
        self
    }

    /// Sets the similarity-index API key.
    #[must_use]
    pub fn with_index_api_key(mut self, api_key: Option<String>) -> Self {
        self.index_api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    /// Returns the config file path.
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Returns the bot token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns the token used for transfers.
    pub fn transfer_token(&self) -> &str {
        self.transfer_token.as_deref().unwrap_or(&self.token)
    }

    /// Returns the similarity-index API key override.
    pub fn index_api_key(&self) -> Option<&str> {
        self.index_api_key.as_deref()
    }

    /// Returns whether dry-run mode is enabled.
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }
}
