//! Configuration loading.
//! Reads diptych.toml from the current directory or the path in the
//! DIPTYCH_CONFIG env var; a missing file falls back to defaults so the
//! server comes up against a local OpenAI-compatible endpoint.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use diptych_core::Tone;
use diptych_llm::{ModelSettings, Provider};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub raster: RasterConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String { "127.0.0.1:3200".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: Provider,
    #[serde(default = "default_model")]
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    #[serde(default)]
    pub tone: Tone,
}

fn default_provider() -> Provider { Provider::OpenaiCompatible }
fn default_model()    -> String   { "gpt-4o".to_string() }

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            base_url: None,
            tone: Tone::default(),
        }
    }
}

impl ModelConfig {
    /// Credentials resolve from the file first, then DIPTYCH_API_KEY.
    pub fn settings(&self) -> ModelSettings {
        let api_key = self
            .api_key
            .clone()
            .or_else(|| std::env::var("DIPTYCH_API_KEY").ok());
        ModelSettings {
            provider: self.provider,
            model: self.model.clone(),
            api_key,
            base_url: self.base_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RasterConfig {
    #[serde(default = "default_scale")]
    pub scale: f32,
    #[serde(default = "default_page_ceiling")]
    pub page_ceiling: u32,
}

fn default_scale()        -> f32 { 2.0 }
fn default_page_ceiling() -> u32 { 24 }

impl Default for RasterConfig {
    fn default() -> Self {
        Self { scale: default_scale(), page_ceiling: default_page_ceiling() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
}

fn default_store_path() -> String { "./diptych-store.json".to_string() }

impl Default for StoreConfig {
    fn default() -> Self {
        Self { path: default_store_path() }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("DIPTYCH_CONFIG").unwrap_or_else(|_| "diptych.toml".to_string());
        if !Path::new(&path).exists() {
            warn!(path, "config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:3200");
        assert_eq!(config.raster.page_ceiling, 24);
        assert!(matches!(config.model.provider, Provider::OpenaiCompatible));
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config: Config = toml::from_str(
            "[model]\nprovider = \"anthropic\"\nmodel = \"claude-sonnet-4-5\"\n\n[raster]\npage_ceiling = 8\n",
        )
        .unwrap();
        assert!(matches!(config.model.provider, Provider::Anthropic));
        assert_eq!(config.raster.page_ceiling, 8);
        assert_eq!(config.server.bind, "127.0.0.1:3200");
    }
}
