//! Model response normalizer.
//!
//! Takes the raw text a vision model produced for one page and turns it into
//! typed segments. Never fails past its own boundary: a response that cannot
//! be parsed degrades to a single error-marker segment for that page so the
//! rest of the batch survives.

use tracing::warn;
use uuid::Uuid;

use crate::segment::{coerce_kind, Segment, SegmentKind};

/// Strip markdown code fences the model may have wrapped the JSON in.
/// Handles an optional language tag on the opening fence.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(newline) = rest.find('\n') else {
        return trimmed;
    };
    let body = rest[newline + 1..].trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[derive(Debug, serde::Deserialize)]
struct RawSegment {
    #[serde(default, alias = "kind")]
    r#type: String,
    #[serde(default)]
    original: String,
    #[serde(default)]
    translated: String,
    #[serde(default)]
    citations: Vec<String>,
}

#[derive(Debug, serde::Deserialize)]
struct RawPage {
    segments: Vec<RawSegment>,
}

fn segment_id(page_index: u32, position: usize, token: &str) -> String {
    format!("p{page_index}-{position}-{token}")
}

/// Normalize one page's raw model output into segments.
///
/// The ids combine page index, item position and a per-call uniqueness token,
/// so repeated re-analysis of the same page never collides with earlier ids.
pub fn normalize(raw: &str, page_index: u32) -> Vec<Segment> {
    let body = strip_code_fences(raw);

    // Expected shape is an object with a `segments` array; a bare array is
    // tolerated as a repair.
    let parsed = serde_json::from_str::<RawPage>(body)
        .map(|page| page.segments)
        .or_else(|_| serde_json::from_str::<Vec<RawSegment>>(body));

    let items = match parsed {
        Ok(items) => items,
        Err(err) => {
            warn!(page = page_index, error = %err, "page response did not parse, substituting error segment");
            return vec![error_segment(page_index)];
        }
    };

    let token = Uuid::new_v4().simple().to_string();
    let token = &token[..8];

    items
        .into_iter()
        .enumerate()
        .map(|(position, item)| {
            Segment::new(
                segment_id(page_index, position, token),
                page_index,
                coerce_kind(&item.r#type),
                item.original,
                item.translated,
                item.citations,
            )
        })
        .collect()
}

/// The single substitute segment for a page whose response was unusable.
/// Marked in both languages so either pane makes the failure visible; the
/// user retries via re-analysis of this one page.
fn error_segment(page_index: u32) -> Segment {
    Segment::new(
        segment_id(page_index, 0, "error"),
        page_index,
        SegmentKind::Text,
        format!("[Page {page_index}] The model output for this page could not be parsed."),
        format!("[{page_index}페이지] 이 페이지의 분석 결과를 해석하지 못했습니다. 페이지 재분석으로 다시 시도해 주세요."),
        Vec::new(),
    )
}
