//! Language-model routing between configured repositories.

use crate::config::RepositoryConfig;
use crate::issue::Issue;
use crate::llm::LanguageModel;
use crate::triage::RouterError;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// Longest body excerpt sent to the model, in characters.
const MAX_BODY_CHARS: usize = 3000;

const SYSTEM_PROMPT: &str = r#"You are an expert GitHub issue router. Your task is to analyze the intent of an issue and decide which repository it belongs in.
Respond ONLY with a JSON object containing:
- "target_repo": The "org/repo" string of the destination, or the current repo if it belongs here.
- "confidence": A float from 0 to 1.
- "reason": A brief explanation of why this intent matches the repository description.

If the issue clearly belongs in its current repository, "target_repo" should match the current repo."#;

/// The model's routing suggestion. Never persisted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RoutingResult {
    /// Suggested `org/repo`.
    pub target_repo: String,

    /// Confidence in `[0, 1]`.
    pub confidence: f64,

    /// Short explanation.
    pub reason: String,
}

/// Asks a language model which configured repository an issue belongs in.
pub struct Router {
    model: Arc<dyn LanguageModel>,
    destinations: Vec<String>,
}

impl Router {
    /// Builds the catalog from enabled repositories that have a description.
    pub fn new(model: Arc<dyn LanguageModel>, repositories: &[RepositoryConfig]) -> Self {
        let destinations = repositories
            .iter()
            .filter(|r| r.enabled && !r.description.trim().is_empty())
            .map(|r| format!("- {}/{}: {}", r.org, r.repo, r.description.trim()))
            .collect();
        Self {
            model,
            destinations,
        }
    }

    /// Suggests a destination for `issue`.
    ///
    /// Returns `Ok(None)` without calling the model when no repository
    /// describes itself.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError`] if the completion fails or its response is not
    /// the expected JSON.
    pub async fn route(&self, issue: &Issue) -> Result<Option<RoutingResult>, RouterError> {
        if self.destinations.is_empty() {
            debug!("No repository descriptions configured, skipping AI routing");
            return Ok(None);
        }

        let prompt = self.build_prompt(issue);
        let response = self
            .model
            .complete_with_system(SYSTEM_PROMPT, &prompt)
            .await?;
        parse_routing_response(&response).map(Some)
    }

    fn build_prompt(&self, issue: &Issue) -> String {
        format!(
            "Current Repository: {}/{}\n\n\
             Issue Title: {}\n\n\
             Issue Description:\n{}\n\n\
             Available Repositories and their purposes:\n{}\n\n\
             Analyze the issue intent. Does it belong in a different repository based on the descriptions? Return JSON only.",
            issue.org,
            issue.repo,
            issue.title,
            truncate_text(&issue.body, MAX_BODY_CHARS),
            self.destinations.join("\n"),
        )
    }
}

/// Cuts `text` to `max_chars` characters, appending `...` when cut.
fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

/// Strips an optional code fence and decodes the JSON object.
fn parse_routing_response(response: &str) -> Result<RoutingResult, RouterError> {
    let trimmed = response.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let unfenced = unfenced.strip_suffix("```").unwrap_or(unfenced).trim();

    serde_json::from_str(unfenced).map_err(|source| {
        debug!(response = %unfenced, "Failed to parse AI routing response");
        RouterError::Parse {
            response: unfenced.to_string(),
            source,
        }
    })
}
