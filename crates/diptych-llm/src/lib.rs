//! Model-client adapters.
//!
//! Backends:
//!   OpenAiCompatibleBackend — any OpenAI-compatible endpoint (OpenAI,
//!                             LMStudio, OpenRouter, vLLM, …)
//!   AnthropicBackend        — Anthropic Messages API (claude-*)
//!   GeminiBackend           — Google Gemini API
//!
//! All three accept one inline JPEG per request; `ModelGateway` adapts them
//! to the pipeline's `ModelClient` port.

pub mod backend;
pub mod gateway;
pub mod prompt;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use diptych_common::ModelError;

pub use backend::{
    AnthropicBackend, ChatBackend, GeminiBackend, InlineImage, OpenAiCompatibleBackend,
    VisionPrompt,
};
pub use gateway::ModelGateway;

/// Which hosted API a model identifier belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    OpenaiCompatible,
    Anthropic,
    Gemini,
}

/// Persisted model settings: provider selection, model identifier and
/// credentials. Read once per gateway construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    pub provider: Provider,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

/// Build the configured backend and wrap it in a gateway.
pub fn build_gateway(settings: &ModelSettings) -> Result<ModelGateway, ModelError> {
    let backend: Arc<dyn ChatBackend> = match settings.provider {
        Provider::OpenaiCompatible => {
            let base_url = settings
                .base_url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com".to_string());
            Arc::new(OpenAiCompatibleBackend::new(
                base_url,
                settings.model.clone(),
                settings.api_key.clone(),
            ))
        }
        Provider::Anthropic => {
            let key = settings.api_key.clone().ok_or_else(|| {
                ModelError::Unavailable("Anthropic backend requires an API key".to_string())
            })?;
            Arc::new(AnthropicBackend::new(key, settings.model.clone()))
        }
        Provider::Gemini => {
            let key = settings.api_key.clone().ok_or_else(|| {
                ModelError::Unavailable("Gemini backend requires an API key".to_string())
            })?;
            Arc::new(GeminiBackend::new(key, settings.model.clone()))
        }
    };
    Ok(ModelGateway::new(backend))
}
