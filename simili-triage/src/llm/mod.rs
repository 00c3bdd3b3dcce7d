//! Language-model collaborator and its serdes-ai implementation.

mod config;
mod error;

pub use config::LlmConfig;
pub use error::LlmError;

use async_trait::async_trait;
use serdes_ai::agent::AgentBuilder;
use serdes_ai_models::Model;
use std::sync::Arc;
use tracing::{debug, warn};

const MODEL_ENV: &str = "SIMILI_LLM_MODEL";
const TEMPERATURE_ENV: &str = "SIMILI_LLM_TEMPERATURE";
const LLM_TIMEOUT_SECS: u64 = 120;

/// Single-shot text completion.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Runs one completion with a system instruction and returns the raw text.
    async fn complete_with_system(&self, system: &str, prompt: &str) -> Result<String, LlmError>;
}

/// [`LanguageModel`] backed by a serdes-ai agent without tools.
pub struct SerdesModel {
    model: Arc<dyn Model>,
    temperature: Option<f64>,
    timeout_secs: u64,
}

impl SerdesModel {
    /// Builds the model from the `[llm]` section, or from `SIMILI_LLM_MODEL`
    /// (e.g. `openai:gpt-4o-mini`) when the section is absent.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::MissingModel`] when neither is set, or
    /// [`LlmError::Model`] when the provider cannot be built.
    pub fn from_config(config: Option<&LlmConfig>) -> Result<Self, LlmError> {
        Ok(Self {
            model: resolve_model(config)?,
            temperature: resolve_temperature(config),
            timeout_secs: resolve_timeout(config),
        })
    }
}

#[async_trait]
impl LanguageModel for SerdesModel {
    async fn complete_with_system(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let mut builder = AgentBuilder::<(), String>::from_arc(Arc::clone(&self.model))
            .system_prompt(system);
        if let Some(temp) = self.temperature {
            builder = builder.temperature(temp);
        }
        let agent = builder.build();

        debug!(prompt_len = prompt.len(), "Running completion");
        let result = tokio::time::timeout(
            tokio::time::Duration::from_secs(self.timeout_secs),
            agent.run(prompt, ()),
        )
        .await
        .map_err(|_| LlmError::Timeout(self.timeout_secs))??;

        Ok(result.output)
    }
}

/// Resolves the LLM model from config or environment.
fn resolve_model(config: Option<&LlmConfig>) -> Result<Arc<dyn Model>, LlmError> {
    if let Some(config) = config {
        return config.build_model();
    }
    let model_spec = std::env::var(MODEL_ENV).map_err(|_| LlmError::MissingModel)?;
    serdes_ai_models::infer_model(&model_spec).map_err(LlmError::Model)
}

/// Outer completion timeout: the configured `timeout-secs`, else the default.
fn resolve_timeout(config: Option<&LlmConfig>) -> u64 {
    config
        .and_then(LlmConfig::timeout_secs)
        .unwrap_or(LLM_TIMEOUT_SECS)
}

/// Validates that a temperature value is finite and within 0.0-2.0.
fn validate_temperature(value: f64, source: &str) -> Option<f64> {
    if !value.is_finite() || !(0.0..=2.0).contains(&value) {
        warn!("Invalid temperature {value} from {source}: must be finite and in range 0.0-2.0");
        return None;
    }
    Some(value)
}

/// Resolves the temperature. The environment variable beats the config file.
fn resolve_temperature(config: Option<&LlmConfig>) -> Option<f64> {
    if let Ok(val) = std::env::var(TEMPERATURE_ENV) {
        if let Ok(temp) = val.parse::<f64>() {
            return validate_temperature(temp, "environment variable");
        }
    }
    config
        .and_then(LlmConfig::temperature)
        .and_then(|t| validate_temperature(t, "config file"))
}
