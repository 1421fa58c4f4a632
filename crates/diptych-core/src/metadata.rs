//! Paper metadata, populated at most once per document.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub journal: Option<String>,
    #[serde(default, alias = "volumeIssue")]
    pub volume_issue: Option<String>,
    #[serde(default)]
    pub pages: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
}

impl PaperMetadata {
    /// Minimal stub used when metadata extraction fails: the file name stands
    /// in for the title so the pipeline never blocks on metadata.
    pub fn fallback(file_name: &str) -> Self {
        let title = std::path::Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name)
            .to_string();
        Self {
            title,
            authors: Vec::new(),
            year: None,
            journal: None,
            volume_issue: None,
            pages: None,
            doi: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_uses_file_stem_as_title() {
        let meta = PaperMetadata::fallback("attention_is_all_you_need.pdf");
        assert_eq!(meta.title, "attention_is_all_you_need");
        assert!(meta.authors.is_empty());
        assert!(meta.doi.is_none());
    }
}
