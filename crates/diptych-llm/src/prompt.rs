//! Prompt construction for the four model-call shapes.

use diptych_core::Tone;

pub const METADATA_SYSTEM: &str = "You extract bibliographic metadata from the \
first page of an academic paper. Respond with a single JSON object and \
nothing else.";

pub fn metadata_prompt() -> String {
    "Read this first page and return JSON with the fields: \
     {\"title\": string, \"authors\": [string], \"year\": string, \
     \"journal\": string, \"volume_issue\": string, \"pages\": string, \
     \"doi\": string}. Use empty strings for anything not visible."
        .to_string()
}

pub const PAGE_SYSTEM: &str = "You segment and translate one page of an \
academic paper into Korean. Respond with a single JSON object and nothing \
else — no code fences, no commentary.";

fn tone_phrase(tone: Tone) -> &'static str {
    match tone {
        Tone::Academic => "formal academic register, preserving technical terminology",
        Tone::Plain    => "plain everyday language a non-specialist can follow",
        Tone::Casual   => "a relaxed conversational register",
    }
}

/// Per-page segmentation + translation prompt. The model sees the 0-based
/// page index; segment ordering follows natural reading order (for
/// two-column layouts: left column top to bottom, then right column).
pub fn page_content_prompt(page_index0: u32, tone: Tone) -> String {
    format!(
        "This is page index {page_index0} of the paper. Split the page into \
         content segments in natural reading order (two-column layouts: left \
         column top to bottom, then right column top to bottom). For each \
         segment give its type (heading, abstract, text, figure_caption, \
         equation, table, code), the original text, and a Korean translation \
         in {tone}. Reflow tables into markdown grids. List citation markers \
         found in the segment under \"citations\". Return JSON: \
         {{\"segments\": [{{\"type\": string, \"original\": string, \
         \"translated\": string, \"citations\": [string]}}]}}.",
        tone = tone_phrase(tone),
    )
}

pub const EXPLAIN_SYSTEM: &str = "You explain a passage from an academic \
paper in depth. Respond with a single JSON object and nothing else.";

pub fn explain_prompt(original: &str, translated: &str, user_prompt: Option<&str>) -> String {
    let focus = match user_prompt {
        Some(extra) if !extra.trim().is_empty() => format!("\nFocus on: {extra}"),
        _ => String::new(),
    };
    format!(
        "Explain the following passage for a graduate student: background, \
         what it claims, and why it matters.{focus}\n\nOriginal:\n{original}\n\n\
         Translation:\n{translated}\n\nReturn JSON: {{\"korean\": string, \
         \"english\": string}}."
    )
}

pub fn chat_system(document_context: &str) -> String {
    format!(
        "You answer questions about an academic paper the user is reading. \
         Paper context:\n{document_context}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_prompt_carries_zero_based_index_and_tone() {
        let p = page_content_prompt(4, Tone::Plain);
        assert!(p.contains("page index 4"));
        assert!(p.contains("non-specialist"));
        assert!(p.contains("\"segments\""));
    }

    #[test]
    fn explain_prompt_includes_optional_focus() {
        let p = explain_prompt("orig", "trans", Some("the loss function"));
        assert!(p.contains("Focus on: the loss function"));
        let p = explain_prompt("orig", "trans", None);
        assert!(!p.contains("Focus on:"));
    }
}
