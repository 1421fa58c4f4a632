//! Model client port. Concrete vision backends live in `diptych-llm`; the
//! pipeline only ever sees this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use diptych_common::{ModelError, PageImage};

use crate::metadata::PaperMetadata;

/// Translation-tone selector. Affects prompt phrasing only; the pipeline
/// passes it through opaquely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Academic,
    Plain,
    Casual,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Academic => "academic",
            Tone::Plain    => "plain",
            Tone::Casual   => "casual",
        }
    }
}

/// A deep explanation of one segment, in both output languages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    pub korean: String,
    #[serde(default)]
    pub english: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String, // "user" | "assistant"
    pub content: String,
}

/// Boundary to the language model; all network concerns live behind it.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Extract paper metadata from the first page. Best-effort; the caller
    /// substitutes a file-name stub on failure.
    async fn request_metadata(&self, page_one: &PageImage) -> Result<PaperMetadata, ModelError>;

    /// Segmentation + translation for one page. Returns the raw response
    /// text; type labels are NOT validated here — coercion is the
    /// normalizer's job, because models hallucinate labels freely.
    async fn request_page_content(
        &self,
        page: &PageImage,
        page_index0: u32,
        tone: Tone,
    ) -> Result<String, ModelError>;

    /// Deep explanation of one segment, in Korean and English. Best-effort,
    /// never blocks the page pipeline.
    async fn explain_block(
        &self,
        original: &str,
        translated: &str,
        user_prompt: Option<&str>,
    ) -> Result<Explanation, ModelError>;

    /// One turn of document-context chat. Best-effort.
    async fn chat_turn(
        &self,
        history: &[ChatMessage],
        message: &str,
        document_context: &str,
    ) -> Result<String, ModelError>;
}
