//! Vision backend trait and concrete implementations.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use diptych_common::ModelError;

// ── Request ───────────────────────────────────────────────────────────────────

/// One inline image attached to a prompt.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub media_type: &'static str,
    pub base64: String,
}

impl InlineImage {
    pub fn jpeg(bytes: &[u8]) -> Self {
        Self { media_type: "image/jpeg", base64: BASE64.encode(bytes) }
    }

    fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.base64)
    }
}

/// A single completion request: optional system prompt, one user turn with
/// an optional image, plus prior conversation turns for chat.
#[derive(Debug, Clone)]
pub struct VisionPrompt {
    pub system: Option<String>,
    /// (role, content) pairs preceding the final user turn.
    pub history: Vec<(String, String)>,
    pub text: String,
    pub image: Option<InlineImage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl VisionPrompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            system: None,
            history: Vec::new(),
            text: text.into(),
            image: None,
            max_tokens: 4096,
            temperature: 0.1,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_image(mut self, image: InlineImage) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_history(mut self, history: Vec<(String, String)>) -> Self {
        self.history = history;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

// ── Trait ─────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Run one completion and return the response text.
    async fn complete(&self, prompt: VisionPrompt) -> Result<String, ModelError>;
    fn model_id(&self) -> &str;
}

// ── Shared helpers ────────────────────────────────────────────────────────────

fn http_err(err: reqwest::Error) -> ModelError {
    ModelError::Http(err.to_string())
}

async fn check_response_status(resp: reqwest::Response) -> Result<serde_json::Value, ModelError> {
    let status = resp.status().as_u16();
    let body: serde_json::Value = resp.json().await.map_err(http_err)?;
    if status >= 400 {
        let message = body["error"]["message"]
            .as_str()
            .or_else(|| body["message"].as_str())
            .unwrap_or("unknown API error")
            .to_string();
        return Err(ModelError::Api { status, message });
    }
    Ok(body)
}

// ── 1. OpenAI-compatible (OpenAI, LMStudio, OpenRouter, vLLM, …) ─────────────

pub struct OpenAiCompatibleBackend {
    pub base_url: String,
    pub model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiCompatibleBackend {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None      => req,
        }
    }
}

#[async_trait]
impl ChatBackend for OpenAiCompatibleBackend {
    async fn complete(&self, prompt: VisionPrompt) -> Result<String, ModelError> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));

        let mut messages: Vec<serde_json::Value> = Vec::new();
        if let Some(ref system) = prompt.system {
            messages.push(serde_json::json!({"role": "system", "content": system}));
        }
        for (role, content) in &prompt.history {
            messages.push(serde_json::json!({"role": role, "content": content}));
        }
        let user_content = match &prompt.image {
            Some(image) => serde_json::json!([
                {"type": "text", "text": prompt.text},
                {"type": "image_url", "image_url": {"url": image.data_url()}},
            ]),
            None => serde_json::Value::String(prompt.text.clone()),
        };
        messages.push(serde_json::json!({"role": "user", "content": user_content}));

        let body = serde_json::json!({
            "model":       self.model,
            "messages":    messages,
            "max_tokens":  prompt.max_tokens,
            "temperature": prompt.temperature,
        });

        let resp = self
            .auth(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(http_err)?;
        let json = check_response_status(resp).await?;

        Ok(json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string())
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

// ── 2. Anthropic (claude-*) ───────────────────────────────────────────────────

pub struct AnthropicBackend {
    pub model: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicBackend {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), model: model.into(), client: reqwest::Client::new() }
    }
}

#[async_trait]
impl ChatBackend for AnthropicBackend {
    async fn complete(&self, prompt: VisionPrompt) -> Result<String, ModelError> {
        let mut messages: Vec<serde_json::Value> = prompt
            .history
            .iter()
            .map(|(role, content)| serde_json::json!({"role": role, "content": content}))
            .collect();

        // Image block first, then the instruction text.
        let user_content = match &prompt.image {
            Some(image) => serde_json::json!([
                {
                    "type": "image",
                    "source": {
                        "type": "base64",
                        "media_type": image.media_type,
                        "data": image.base64,
                    }
                },
                {"type": "text", "text": prompt.text},
            ]),
            None => serde_json::Value::String(prompt.text.clone()),
        };
        messages.push(serde_json::json!({"role": "user", "content": user_content}));

        let mut body = serde_json::json!({
            "model":      self.model,
            "messages":   messages,
            "max_tokens": prompt.max_tokens,
        });
        if let Some(ref system) = prompt.system {
            body["system"] = serde_json::Value::String(system.clone());
        }

        let resp = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(http_err)?;
        let json = check_response_status(resp).await?;

        Ok(json["content"]
            .as_array()
            .and_then(|blocks| blocks.first())
            .and_then(|b| b["text"].as_str())
            .unwrap_or("")
            .to_string())
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

// ── 3. Google Gemini ──────────────────────────────────────────────────────────

pub struct GeminiBackend {
    pub model: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), model: model.into(), client: reqwest::Client::new() }
    }
}

#[async_trait]
impl ChatBackend for GeminiBackend {
    async fn complete(&self, prompt: VisionPrompt) -> Result<String, ModelError> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );

        let mut contents: Vec<serde_json::Value> = prompt
            .history
            .iter()
            .map(|(role, content)| {
                let role = if role == "assistant" { "model" } else { "user" };
                serde_json::json!({"role": role, "parts": [{"text": content}]})
            })
            .collect();

        let mut parts: Vec<serde_json::Value> = Vec::new();
        if let Some(ref image) = prompt.image {
            parts.push(serde_json::json!({
                "inline_data": {"mime_type": image.media_type, "data": image.base64}
            }));
        }
        parts.push(serde_json::json!({"text": prompt.text}));
        contents.push(serde_json::json!({"role": "user", "parts": parts}));

        let mut body = serde_json::json!({
            "contents": contents,
            "generationConfig": {
                "maxOutputTokens": prompt.max_tokens,
                "temperature":     prompt.temperature,
            }
        });
        if let Some(ref system) = prompt.system {
            body["systemInstruction"] = serde_json::json!({"parts": [{"text": system}]});
        }

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(http_err)?;
        let json = check_response_status(resp).await?;

        Ok(json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or("")
            .to_string())
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_image_builds_a_data_url() {
        let image = InlineImage::jpeg(&[0xFF, 0xD8, 0xFF]);
        assert!(image.data_url().starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn openai_compatible_with_no_key() {
        let b = OpenAiCompatibleBackend::new("http://localhost:1234", "local-model", None);
        assert_eq!(b.model_id(), "local-model");
    }

    #[test]
    fn anthropic_model_id() {
        let b = AnthropicBackend::new("sk-ant-test", "claude-sonnet-4-5");
        assert_eq!(b.model_id(), "claude-sonnet-4-5");
    }

    #[test]
    fn gemini_model_id() {
        let b = GeminiBackend::new("AIza-test", "gemini-2.0-flash");
        assert_eq!(b.model_id(), "gemini-2.0-flash");
    }

    #[test]
    fn prompt_builder_defaults() {
        let p = VisionPrompt::new("hello").with_system("sys");
        assert_eq!(p.max_tokens, 4096);
        assert!(p.image.is_none());
        assert_eq!(p.system.as_deref(), Some("sys"));
    }
}
