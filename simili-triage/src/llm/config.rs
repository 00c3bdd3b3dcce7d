//! LLM provider configuration.

use crate::llm::error::LlmError;
use serdes_ai_models::{build_model_with_config, infer_model, openrouter::OpenRouterModel, Model};
use std::sync::Arc;

/// Provider-specific `[llm]` section, tagged by `provider`.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum LlmConfig {
    /// OpenAI provider configuration.
    #[serde(rename = "openai")]
    OpenAi {
        /// Model name (e.g., "gpt-4o-mini").
        model: String,
        /// API key (optional, falls back to OPENAI_API_KEY env var).
        #[serde(default, rename = "api-key")]
        api_key: Option<String>,
        /// Base URL (optional).
        #[serde(default, rename = "base-url")]
        base_url: Option<String>,
        /// Timeout in seconds (optional).
        #[serde(default, rename = "timeout-secs")]
        timeout_secs: Option<u64>,
        /// Sampling temperature (optional, 0.0-2.0).
        #[serde(default)]
        temperature: Option<f64>,
    },

    /// OpenRouter provider configuration.
    #[serde(rename = "openrouter")]
    OpenRouter {
        /// Model name (e.g., "anthropic/claude-3-opus").
        model: String,
        /// API key (optional, falls back to OPENROUTER_API_KEY env var).
        #[serde(default, rename = "api-key")]
        api_key: Option<String>,
        /// HTTP Referer header (optional).
        #[serde(default, rename = "http-referer")]
        http_referer: Option<String>,
        /// App title header (optional).
        #[serde(default, rename = "app-title")]
        app_title: Option<String>,
        /// Sampling temperature (optional, 0.0-2.0).
        #[serde(default)]
        temperature: Option<f64>,
    },

    /// Anthropic provider configuration.
    Anthropic {
        /// Model name (e.g., "claude-3-5-sonnet-20241022").
        model: String,
        /// API key (optional, falls back to ANTHROPIC_API_KEY env var).
        #[serde(default, rename = "api-key")]
        api_key: Option<String>,
        /// Base URL (optional).
        #[serde(default, rename = "base-url")]
        base_url: Option<String>,
        /// Timeout in seconds (optional).
        #[serde(default, rename = "timeout-secs")]
        timeout_secs: Option<u64>,
        /// Sampling temperature (optional, 0.0-2.0).
        #[serde(default)]
        temperature: Option<f64>,
    },

    /// Gemini provider configuration.
    Gemini {
        /// Model name (e.g., "gemini-2.0-flash").
        model: String,
        /// API key (optional, falls back to GOOGLE_API_KEY env var).
        #[serde(default, rename = "api-key")]
        api_key: Option<String>,
        /// Base URL (optional).
        #[serde(default, rename = "base-url")]
        base_url: Option<String>,
        /// Timeout in seconds (optional).
        #[serde(default, rename = "timeout-secs")]
        timeout_secs: Option<u64>,
        /// Sampling temperature (optional, 0.0-2.0).
        #[serde(default)]
        temperature: Option<f64>,
    },
}

impl LlmConfig {
    /// Configured temperature, if any.
    #[must_use]
    pub fn temperature(&self) -> Option<f64> {
        match self {
            Self::OpenAi { temperature, .. }
            | Self::OpenRouter { temperature, .. }
            | Self::Anthropic { temperature, .. }
            | Self::Gemini { temperature, .. } => *temperature,
        }
    }

    /// Configured request timeout in seconds, if any.
    #[must_use]
    pub fn timeout_secs(&self) -> Option<u64> {
        match self {
            Self::OpenAi { timeout_secs, .. }
            | Self::Anthropic { timeout_secs, .. }
            | Self::Gemini { timeout_secs, .. } => *timeout_secs,
            Self::OpenRouter { .. } => None,
        }
    }

    /// Builds a model from the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Model`] if the provider rejects the settings.
    pub fn build_model(&self) -> Result<Arc<dyn Model>, LlmError> {
        match self {
            Self::OpenRouter {
                model,
                api_key,
                http_referer,
                app_title,
                ..
            } => {
                if api_key.is_none() && http_referer.is_none() && app_title.is_none() {
                    let spec = format!("openrouter:{model}");
                    return infer_model(&spec).map_err(LlmError::Model);
                }
                let mut model = match api_key {
                    Some(key) => OpenRouterModel::new(model, key),
                    None => OpenRouterModel::from_env(model).map_err(LlmError::Model)?,
                };
                if let Some(referer) = http_referer {
                    model = model.with_http_referer(referer);
                }
                if let Some(title) = app_title {
                    model = model.with_app_title(title);
                }
                Ok(Arc::new(model))
            }
            Self::OpenAi {
                model,
                api_key,
                base_url,
                timeout_secs,
                ..
            } => build_configured_model("openai", model, api_key, base_url, timeout_secs),
            Self::Anthropic {
                model,
                api_key,
                base_url,
                timeout_secs,
                ..
            } => build_configured_model("anthropic", model, api_key, base_url, timeout_secs),
            Self::Gemini {
                model,
                api_key,
                base_url,
                timeout_secs,
                ..
            } => build_configured_model("gemini", model, api_key, base_url, timeout_secs),
        }
    }
}

/// Builds a configured model for generic providers.
fn build_configured_model(
    provider: &str,
    model: &str,
    api_key: &Option<String>,
    base_url: &Option<String>,
    timeout_secs: &Option<u64>,
) -> Result<Arc<dyn Model>, LlmError> {
    let resolved_key = api_key
        .as_deref()
        .map(str::to_owned)
        .or_else(|| env_api_key(provider));
    let timeout = timeout_secs.map(core::time::Duration::from_secs);
    if resolved_key.is_none() && base_url.is_none() && timeout_secs.is_none() {
        let spec = format!("{provider}:{model}");
        return infer_model(&spec).map_err(LlmError::Model);
    }
    build_model_with_config(
        provider,
        model,
        resolved_key.as_deref(),
        base_url.as_deref(),
        timeout,
    )
    .map_err(LlmError::Model)
}

/// Gets the API key from environment variables for a provider.
fn env_api_key(provider: &str) -> Option<String> {
    let var = match provider {
        "openai" => "OPENAI_API_KEY",
        "anthropic" => "ANTHROPIC_API_KEY",
        "gemini" => "GOOGLE_API_KEY",
        _ => return None,
    };
    std::env::var(var).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Section {
        llm: LlmConfig,
    }

    fn parse(toml_text: &str) -> LlmConfig {
        toml::from_str::<Section>(toml_text).unwrap().llm
    }

    #[test]
    fn parses_openai() {
        let config = parse(
            r#"
[llm]
provider = "openai"
model = "gpt-4o"
base-url = "https://api.openai.com/v1"
timeout-secs = 30
"#,
        );
        match config {
            LlmConfig::OpenAi {
                model,
                base_url,
                timeout_secs,
                ..
            } => {
                assert_eq!(model, "gpt-4o");
                assert_eq!(base_url.as_deref(), Some("https://api.openai.com/v1"));
                assert_eq!(timeout_secs, Some(30));
            }
            _ => panic!("expected openai"),
        }
    }

    #[test]
    fn parses_openrouter() {
        let config = parse(
            r#"
[llm]
provider = "openrouter"
model = "anthropic/claude-3-opus"
http-referer = "https://example.com"
app-title = "Simili Triage"
"#,
        );
        match config {
            LlmConfig::OpenRouter {
                model,
                http_referer,
                app_title,
                ..
            } => {
                assert_eq!(model, "anthropic/claude-3-opus");
                assert_eq!(http_referer.as_deref(), Some("https://example.com"));
                assert_eq!(app_title.as_deref(), Some("Simili Triage"));
            }
            _ => panic!("expected openrouter"),
        }
    }

    #[test]
    fn parses_gemini_with_temperature() {
        let config = parse(
            r#"
[llm]
provider = "gemini"
model = "gemini-2.0-flash"
temperature = 0.2
"#,
        );
        assert!(matches!(config, LlmConfig::Gemini { .. }));
        assert_eq!(config.temperature(), Some(0.2));
    }

    #[test]
    fn temperature_defaults_to_none() {
        let config = parse(
            r#"
[llm]
provider = "anthropic"
model = "claude-3-5-sonnet-20241022"
"#,
        );
        assert_eq!(config.temperature(), None);
    }

    #[test]
    fn rejects_unknown_provider() {
        let result = toml::from_str::<Section>(
            r#"
[llm]
provider = "mystery"
model = "x"
"#,
        );
        assert!(result.is_err());
    }
}
