//! Adapts a `ChatBackend` to the pipeline's `ModelClient` port: builds the
//! prompts, attaches page images, and parses the structured responses.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use diptych_common::{ModelError, PageImage};
use diptych_core::{
    strip_code_fences, ChatMessage, Explanation, ModelClient, PaperMetadata, Tone,
};

use crate::backend::{ChatBackend, InlineImage, VisionPrompt};
use crate::prompt;

pub struct ModelGateway {
    backend: Arc<dyn ChatBackend>,
}

impl ModelGateway {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    pub fn model_id(&self) -> &str {
        self.backend.model_id()
    }
}

/// Parse a metadata response leniently: fences stripped, all fields
/// defaulted, but an empty title is treated as a parse failure so the
/// caller's file-name fallback kicks in.
fn parse_metadata(raw: &str) -> Result<PaperMetadata, ModelError> {
    let body = strip_code_fences(raw);
    let meta: PaperMetadata =
        serde_json::from_str(body).map_err(|e| ModelError::Parse(e.to_string()))?;
    if meta.title.trim().is_empty() {
        return Err(ModelError::Parse("metadata response carried no title".to_string()));
    }
    Ok(meta)
}

/// Parse an explanation response; an unparsable body degrades to the raw
/// text as the Korean explanation rather than failing the request.
fn parse_explanation(raw: &str) -> Explanation {
    let body = strip_code_fences(raw);
    serde_json::from_str(body).unwrap_or_else(|_| Explanation {
        korean: body.to_string(),
        english: String::new(),
    })
}

#[async_trait]
impl ModelClient for ModelGateway {
    async fn request_metadata(&self, page_one: &PageImage) -> Result<PaperMetadata, ModelError> {
        debug!(model = self.backend.model_id(), "requesting paper metadata");
        let request = VisionPrompt::new(prompt::metadata_prompt())
            .with_system(prompt::METADATA_SYSTEM)
            .with_image(InlineImage::jpeg(&page_one.jpeg))
            .with_max_tokens(1024);
        let raw = self.backend.complete(request).await?;
        parse_metadata(&raw)
    }

    async fn request_page_content(
        &self,
        page: &PageImage,
        page_index0: u32,
        tone: Tone,
    ) -> Result<String, ModelError> {
        debug!(page = page.page_index, tone = tone.as_str(), "requesting page content");
        let request = VisionPrompt::new(prompt::page_content_prompt(page_index0, tone))
            .with_system(prompt::PAGE_SYSTEM)
            .with_image(InlineImage::jpeg(&page.jpeg))
            .with_max_tokens(8192);
        // Raw text straight through: label validation and JSON repair are
        // the normalizer's job.
        self.backend.complete(request).await
    }

    async fn explain_block(
        &self,
        original: &str,
        translated: &str,
        user_prompt: Option<&str>,
    ) -> Result<Explanation, ModelError> {
        let request = VisionPrompt::new(prompt::explain_prompt(original, translated, user_prompt))
            .with_system(prompt::EXPLAIN_SYSTEM);
        let raw = self.backend.complete(request).await?;
        Ok(parse_explanation(&raw))
    }

    async fn chat_turn(
        &self,
        history: &[ChatMessage],
        message: &str,
        document_context: &str,
    ) -> Result<String, ModelError> {
        let turns = history
            .iter()
            .map(|m| (m.role.clone(), m.content.clone()))
            .collect();
        let request = VisionPrompt::new(message)
            .with_system(prompt::chat_system(document_context))
            .with_history(turns);
        self.backend.complete(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_parses_fenced_json() {
        let raw = "```json\n{\"title\":\"Deep Residual Learning\",\"authors\":[\"He, K.\"],\"year\":\"2016\"}\n```";
        let meta = parse_metadata(raw).unwrap();
        assert_eq!(meta.title, "Deep Residual Learning");
        assert_eq!(meta.authors, vec!["He, K.".to_string()]);
        assert_eq!(meta.year.as_deref(), Some("2016"));
    }

    #[test]
    fn metadata_without_title_is_a_parse_error() {
        assert!(matches!(
            parse_metadata("{\"authors\":[\"someone\"]}"),
            Err(ModelError::Parse(_))
        ));
        assert!(matches!(parse_metadata("not json"), Err(ModelError::Parse(_))));
    }

    #[test]
    fn explanation_degrades_to_raw_text() {
        let parsed = parse_explanation("{\"korean\":\"설명\",\"english\":\"expl\"}");
        assert_eq!(parsed.korean, "설명");
        let degraded = parse_explanation("plain prose answer");
        assert_eq!(degraded.korean, "plain prose answer");
        assert!(degraded.english.is_empty());
    }
}
