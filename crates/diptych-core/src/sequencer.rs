//! Progressive load policy: decides what range the batch controller runs
//! next. Stateless beyond what it derives from the document model.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::batch::{BatchError, BatchOutcome, BatchRequest, FileHandle, PageBatchController, UNBOUNDED_END};
use crate::client::Tone;
use crate::collection::DocumentModel;

/// Pages per default batch.
pub const DEFAULT_BATCH_PAGES: u32 = 2;

/// What a page-picker click resolved to.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PageAction {
    /// The page already has segments: pure scroll-into-view, no pipeline.
    ScrolledIntoView { page: u32 },
    /// The page was translated on demand.
    Translated { page: u32, outcome: BatchOutcome },
}

pub struct ProgressiveLoader {
    controller: Arc<PageBatchController>,
    doc: Arc<DocumentModel>,
}

impl ProgressiveLoader {
    pub fn new(controller: Arc<PageBatchController>, doc: Arc<DocumentModel>) -> Self {
        Self { controller, doc }
    }

    /// The next unprocessed default-size range.
    pub fn next_range(&self) -> (u32, u32) {
        let start = self.doc.watermark() + 1;
        (start, start + DEFAULT_BATCH_PAGES - 1)
    }

    /// First batch for a fresh document: pages 1-2, or "as many pages as the
    /// rasterizer will give us" in full-document mode.
    pub async fn start(
        &self,
        file: &FileHandle,
        tone: Tone,
        full_document: bool,
    ) -> Result<BatchOutcome, BatchError> {
        let end = if full_document { UNBOUNDED_END } else { DEFAULT_BATCH_PAGES };
        self.controller
            .process_range(file, BatchRequest { start: 1, end, tone, append: false })
            .await
    }

    /// Translate the next default-size batch after the watermark.
    pub async fn load_next(&self, file: &FileHandle, tone: Tone) -> Result<BatchOutcome, BatchError> {
        let (start, end) = self.next_range();
        info!(start, end, "loading next batch");
        self.controller
            .process_range(file, BatchRequest { start, end, tone, append: true })
            .await
    }

    /// Page-picker click: an already-processed page scrolls into view, an
    /// unprocessed one is translated on demand as a single-page append batch.
    pub async fn open_page(
        &self,
        file: &FileHandle,
        tone: Tone,
        page: u32,
    ) -> Result<PageAction, BatchError> {
        if self.doc.distinct_processed_pages().contains(&page) {
            return Ok(PageAction::ScrolledIntoView { page });
        }
        let outcome = self
            .controller
            .process_range(file, BatchRequest { start: page, end: page, tone, append: true })
            .await?;
        Ok(PageAction::Translated { page, outcome })
    }

    /// Re-analysis: the degenerate single-page append batch. Page-replacement
    /// merge overwrites exactly that page's segments.
    pub async fn reanalyze(
        &self,
        file: &FileHandle,
        tone: Tone,
        page: u32,
    ) -> Result<BatchOutcome, BatchError> {
        info!(page, "re-analyzing page");
        self.controller
            .process_range(file, BatchRequest { start: page, end: page, tone, append: true })
            .await
    }
}
