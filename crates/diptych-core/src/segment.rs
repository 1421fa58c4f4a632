//! Segment data model and the free-form type-label coercion table.

use serde::{Deserialize, Serialize};

/// Closed set of content segment types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Text,
    Heading,
    Abstract,
    FigureCaption,
    Equation,
    Table,
    Code,
}

impl SegmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentKind::Text          => "text",
            SegmentKind::Heading       => "heading",
            SegmentKind::Abstract      => "abstract",
            SegmentKind::FigureCaption => "figure_caption",
            SegmentKind::Equation      => "equation",
            SegmentKind::Table         => "table",
            SegmentKind::Code          => "code",
        }
    }
}

/// Ordered classification table for free-form model type labels.
///
/// Evaluated top to bottom; the first family with a matching keyword wins,
/// so a label carrying both "table" and "fig" resolves to `FigureCaption`.
/// Keeping the precedence as data makes it independently testable.
const KIND_TABLE: &[(&[&str], SegmentKind)] = &[
    (&["heading", "title", "header", "section"], SegmentKind::Heading),
    (&["abstract"], SegmentKind::Abstract),
    (&["fig", "caption"], SegmentKind::FigureCaption),
    (&["equation", "math", "formula"], SegmentKind::Equation),
    (&["table"], SegmentKind::Table),
    (&["code", "listing", "algorithm"], SegmentKind::Code),
];

/// Coerce whatever type label the model produced into the closed set.
/// Case-insensitive substring match; anything unrecognized becomes `Text`.
pub fn coerce_kind(label: &str) -> SegmentKind {
    let label = label.to_lowercase();
    for (keywords, kind) in KIND_TABLE {
        if keywords.iter().any(|k| label.contains(k)) {
            return *kind;
        }
    }
    SegmentKind::Text
}

/// One classified, paired (original + translated) unit of document content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    /// Unique within the document for the lifetime of the session; a page
    /// re-analysis produces fresh ids.
    pub id: String,
    /// 1-based page the segment was extracted from.
    pub page_index: u32,
    pub kind: SegmentKind,
    pub original: String,
    pub translated: String,
    #[serde(default)]
    pub citations: Vec<String>,
    /// Deep explanations, absent until requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation_en: Option<String>,
    /// True only while an explanation request is in flight.
    #[serde(default)]
    pub is_explaining: bool,
    /// User-owned annotations; the pipeline never touches these.
    #[serde(default)]
    pub is_bookmarked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_note: Option<String>,
}

impl Segment {
    pub fn new(
        id: String,
        page_index: u32,
        kind: SegmentKind,
        original: String,
        translated: String,
        citations: Vec<String>,
    ) -> Self {
        Self {
            id,
            page_index,
            kind,
            original,
            translated,
            citations,
            explanation: None,
            explanation_en: None,
            is_explaining: false,
            is_bookmarked: false,
            user_note: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_known_families() {
        assert_eq!(coerce_kind("HEADING"), SegmentKind::Heading);
        assert_eq!(coerce_kind("Section Title"), SegmentKind::Heading);
        assert_eq!(coerce_kind("abstract"), SegmentKind::Abstract);
        assert_eq!(coerce_kind("figure caption"), SegmentKind::FigureCaption);
        assert_eq!(coerce_kind("math_block"), SegmentKind::Equation);
        assert_eq!(coerce_kind("Formula"), SegmentKind::Equation);
        assert_eq!(coerce_kind("data table"), SegmentKind::Table);
        assert_eq!(coerce_kind("code listing"), SegmentKind::Code);
    }

    #[test]
    fn coerce_defaults_to_text() {
        assert_eq!(coerce_kind("paragraph"), SegmentKind::Text);
        assert_eq!(coerce_kind(""), SegmentKind::Text);
        assert_eq!(coerce_kind("body"), SegmentKind::Text);
    }

    #[test]
    fn coerce_precedence_is_table_order() {
        // Caption family is checked before the table family.
        assert_eq!(coerce_kind("table figure"), SegmentKind::FigureCaption);
        // Heading beats everything else.
        assert_eq!(coerce_kind("table heading"), SegmentKind::Heading);
        assert_eq!(coerce_kind("abstract heading"), SegmentKind::Heading);
    }

    #[test]
    fn coerce_is_deterministic() {
        for label in ["Fig. 3", "fig. 3", "FIG. 3"] {
            assert_eq!(coerce_kind(label), SegmentKind::FigureCaption);
        }
    }
}
