//! Page batch controller: executes "process pages [start, end]" for one
//! document.
//!
//! The per-page loop is strictly sequential — one model request in flight at
//! a time. That is the de facto concurrency limiter (a work queue of depth
//! one) and the linear progress contract depends on it: metadata consumes
//! [0,10], per-page work [10,90], completion sets 100. Merges are keyed by
//! page index, so the merge itself would survive out-of-order completion,
//! but the progress numbers would not.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{info, warn};

use diptych_common::{ModelError, PageImage, PageRasterizer, RenderError};

use crate::client::{ModelClient, Tone};
use crate::collection::DocumentModel;
use crate::event::PipelineEvent;
use crate::metadata::PaperMetadata;
use crate::normalize::normalize;

/// Stand-in end page for "translate the whole document"; the rasterizer's
/// own page ceiling is the real bound.
pub const UNBOUNDED_END: u32 = 9_999;

const METADATA_PROGRESS: u8 = 10;
const PAGE_PROGRESS_CEILING: u8 = 90;

/// The uploaded source document.
#[derive(Debug, Clone)]
pub struct FileHandle {
    pub name: String,
    pub bytes: Arc<Vec<u8>>,
}

impl FileHandle {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), bytes: Arc::new(bytes) }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BatchRequest {
    /// Inclusive 1-based page range.
    pub start: u32,
    pub end: u32,
    pub tone: Tone,
    /// Append/patch into the existing collection instead of describing a
    /// fresh document (subsequent batch, retry, single-page re-analysis).
    pub append: bool,
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("no pages fall inside {start}-{end}")]
    EmptyRange { start: u32, end: u32 },
    #[error("document was reset while the batch was running")]
    Stale,
    #[error("model request failed: {0}")]
    Request(#[from] ModelError),
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    /// Pages actually processed, ascending.
    pub pages: Vec<u32>,
    pub segments_merged: usize,
    pub metadata_fetched: bool,
    /// True when the rasterizer gave out fewer pages than the request asked
    /// for — the page ceiling bounded the work.
    pub truncated: bool,
}

pub struct PageBatchController {
    rasterizer: Arc<dyn PageRasterizer>,
    model: Arc<dyn ModelClient>,
    doc: Arc<DocumentModel>,
    events: broadcast::Sender<PipelineEvent>,
}

impl PageBatchController {
    pub fn new(
        rasterizer: Arc<dyn PageRasterizer>,
        model: Arc<dyn ModelClient>,
        doc: Arc<DocumentModel>,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self { rasterizer, model, doc, events }
    }

    pub fn document(&self) -> &Arc<DocumentModel> {
        &self.doc
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: PipelineEvent) {
        let _ = self.events.send(event);
    }

    fn set_progress(&self, epoch: u64, value: u8) {
        self.doc.set_progress(epoch, value);
        self.emit(PipelineEvent::Progress { value });
    }

    /// Process the inclusive page range `[start, end]`.
    ///
    /// Failure semantics: a render failure aborts before any mutation; a
    /// model failure mid-loop keeps the pages already merged in this batch,
    /// resets progress to 0 and surfaces a single error. Malformed page
    /// output never gets this far — the normalizer absorbs it.
    pub async fn process_range(
        &self,
        file: &FileHandle,
        request: BatchRequest,
    ) -> Result<BatchOutcome, BatchError> {
        let BatchRequest { start, end, tone, append } = request;
        let epoch = self.doc.epoch();
        info!(start, end, append, file = %file.name, "starting page batch");
        self.emit(PipelineEvent::BatchStarted { start, end, append });
        self.doc.set_progress(epoch, 0);

        // Pages 1..=end, not start..=end: metadata extraction needs page 1
        // even when the requested range starts later.
        let rendered = self
            .rasterizer
            .render_pages(file.bytes.as_ref().clone(), end)
            .await?;
        let last_rendered = rendered.last().map(|p| p.page_index).unwrap_or(0);

        let pages: Vec<&PageImage> = rendered
            .iter()
            .filter(|p| p.page_index >= start && p.page_index <= end)
            .collect();
        if pages.is_empty() {
            warn!(start, end, last_rendered, "requested range holds no renderable pages");
            return Err(BatchError::EmptyRange { start, end });
        }

        let truncated = self.detect_truncation(end, last_rendered);

        // Metadata: once per document, first batch only; failure falls back
        // to a file-name stub so the pipeline keeps moving.
        let mut metadata_fetched = false;
        if !append && !self.doc.metadata_present() {
            let (metadata, fallback) = match self.model.request_metadata(&rendered[0]).await {
                Ok(meta) => {
                    metadata_fetched = true;
                    (meta, false)
                }
                Err(err) => {
                    warn!(error = %err, "metadata extraction failed, using file-name stub");
                    (PaperMetadata::fallback(&file.name), true)
                }
            };
            if self.doc.set_metadata_once(epoch, metadata.clone()) {
                self.emit(PipelineEvent::MetadataReady { title: metadata.title, fallback });
            }
        }
        self.set_progress(epoch, METADATA_PROGRESS);

        // Strictly sequential per-page loop (see module docs).
        let total = pages.len();
        let mut segments_merged = 0usize;
        let mut processed: Vec<u32> = Vec::with_capacity(total);
        for (done, &page) in pages.iter().enumerate() {
            let raw = match self
                .model
                .request_page_content(page, page.page_index - 1, tone)
                .await
            {
                Ok(raw) => raw,
                Err(err) => {
                    // Earlier pages of this batch stay merged.
                    warn!(page = page.page_index, error = %err, "batch aborted mid-range");
                    self.set_progress(epoch, 0);
                    self.emit(PipelineEvent::BatchFailed { message: err.to_string() });
                    return Err(BatchError::Request(err));
                }
            };

            let segments = normalize(&raw, page.page_index);
            let count = segments.len();
            if !self.doc.merge_page(epoch, page.page_index, segments) {
                return Err(BatchError::Stale);
            }
            segments_merged += count;
            processed.push(page.page_index);
            self.emit(PipelineEvent::PageMerged { page: page.page_index, segments: count });

            let span = (PAGE_PROGRESS_CEILING - METADATA_PROGRESS) as usize;
            let value = METADATA_PROGRESS + (span * (done + 1) / total) as u8;
            self.set_progress(epoch, value);
        }

        let highest = processed.last().copied().unwrap_or(start);
        self.doc.raise_watermark(epoch, highest);

        let fragment = range_descriptor(&processed);
        if append {
            self.doc.append_active_range(epoch, &fragment);
        } else {
            self.doc.replace_active_range(epoch, fragment);
        }

        self.set_progress(epoch, 100);
        let range = self.doc.active_range();
        self.emit(PipelineEvent::BatchCompleted { pages: processed.clone(), range });
        info!(pages = processed.len(), segments_merged, "page batch complete");

        Ok(BatchOutcome { pages: processed, segments_merged, metadata_fetched, truncated })
    }

    /// "Full document" means "first N pages, capped by the rasterizer" — the
    /// truncation is reported instead of silently inherited.
    fn detect_truncation(&self, requested_end: u32, last_rendered: u32) -> bool {
        let doc_pages = self.doc.page_count(); // 0 = not known yet
        let effective_end = if requested_end == UNBOUNDED_END && doc_pages > 0 {
            doc_pages
        } else {
            requested_end
        };
        let truncated = last_rendered < effective_end && effective_end != UNBOUNDED_END;
        if truncated {
            warn!(
                last_rendered,
                effective_end, "rasterizer page ceiling truncated the requested range"
            );
        }
        truncated
    }
}

/// Human-readable descriptor for a set of processed pages, e.g. "3" or "1-5".
fn range_descriptor(pages: &[u32]) -> String {
    match (pages.first(), pages.last()) {
        (Some(first), Some(last)) if first == last => first.to_string(),
        (Some(first), Some(last)) => format!("{first}-{last}"),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ChatMessage, Explanation};
    use async_trait::async_trait;
    use std::sync::Mutex;

    // ── Test doubles ──────────────────────────────────────────────────────────

    struct FakeRasterizer {
        /// Pages the "document" actually has.
        doc_pages: u32,
        /// Adapter-side ceiling.
        ceiling: u32,
        fail: bool,
    }

    #[async_trait]
    impl PageRasterizer for FakeRasterizer {
        async fn render_pages(
            &self,
            _data: Vec<u8>,
            max_page: u32,
        ) -> Result<Vec<PageImage>, RenderError> {
            if self.fail {
                return Err(RenderError::Unreadable("bad pdf".into()));
            }
            let upto = self.doc_pages.min(self.ceiling).min(max_page);
            Ok((1..=upto)
                .map(|i| PageImage::new(i, vec![0xFF, 0xD8], 100, 140))
                .collect())
        }

        async fn page_count(&self, _data: Vec<u8>) -> Result<u32, RenderError> {
            Ok(self.doc_pages)
        }
    }

    #[derive(Default)]
    struct FakeModel {
        /// Pages whose content response should be unparsable.
        malformed_pages: Vec<u32>,
        /// Pages whose content request should fail outright.
        failing_pages: Vec<u32>,
        fail_metadata: bool,
        /// Suffix so re-analysis produces observably different output.
        variant: &'static str,
        calls: Mutex<Vec<u32>>,
    }

    #[async_trait]
    impl ModelClient for FakeModel {
        async fn request_metadata(&self, _page: &PageImage) -> Result<PaperMetadata, ModelError> {
            if self.fail_metadata {
                return Err(ModelError::Api { status: 500, message: "overloaded".into() });
            }
            Ok(PaperMetadata {
                title: "Attention Is All You Need".into(),
                authors: vec!["Vaswani, A.".into()],
                year: Some("2017".into()),
                journal: Some("NeurIPS".into()),
                volume_issue: None,
                pages: None,
                doi: None,
            })
        }

        async fn request_page_content(
            &self,
            page: &PageImage,
            page_index0: u32,
            _tone: Tone,
        ) -> Result<String, ModelError> {
            assert_eq!(page_index0 + 1, page.page_index, "client receives 0-based index");
            self.calls.lock().unwrap().push(page.page_index);
            if self.failing_pages.contains(&page.page_index) {
                return Err(ModelError::Http("connection reset".into()));
            }
            if self.malformed_pages.contains(&page.page_index) {
                return Ok("sorry, I cannot produce JSON today".into());
            }
            Ok(format!(
                r#"{{"segments":[
                    {{"type":"heading","original":"H{p}{v}","translated":"제목{p}{v}"}},
                    {{"type":"text","original":"B{p}{v}","translated":"본문{p}{v}"}}
                ]}}"#,
                p = page.page_index,
                v = self.variant,
            ))
        }

        async fn explain_block(
            &self,
            _original: &str,
            _translated: &str,
            _user_prompt: Option<&str>,
        ) -> Result<Explanation, ModelError> {
            Ok(Explanation { korean: "설명".into(), english: "explained".into() })
        }

        async fn chat_turn(
            &self,
            _history: &[ChatMessage],
            _message: &str,
            _document_context: &str,
        ) -> Result<String, ModelError> {
            Ok("answer".into())
        }
    }

    fn controller(raster: FakeRasterizer, model: FakeModel) -> PageBatchController {
        PageBatchController::new(
            Arc::new(raster),
            Arc::new(model),
            Arc::new(DocumentModel::new()),
        )
    }

    fn file() -> FileHandle {
        FileHandle::new("paper.pdf", vec![1, 2, 3])
    }

    fn request(start: u32, end: u32, append: bool) -> BatchRequest {
        BatchRequest { start, end, tone: Tone::Academic, append }
    }

    // ── Scenarios ─────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn fresh_document_full_translate() {
        let ctl = controller(
            FakeRasterizer { doc_pages: 5, ceiling: 24, fail: false },
            FakeModel::default(),
        );
        let doc = ctl.document().clone();
        doc.set_page_count_once(doc.epoch(), 5);

        let outcome = ctl
            .process_range(&file(), request(1, UNBOUNDED_END, false))
            .await
            .unwrap();

        assert_eq!(outcome.pages, vec![1, 2, 3, 4, 5]);
        assert!(outcome.metadata_fetched);
        assert!(!outcome.truncated);
        assert_eq!(doc.distinct_processed_pages(), vec![1, 2, 3, 4, 5]);
        assert_eq!(doc.progress(), 100);
        assert_eq!(doc.watermark(), 5);
        // Unbounded request is normalized to the actual processed bound.
        assert_eq!(doc.active_range(), "1-5");
        assert!(doc.metadata_present());
    }

    #[tokio::test]
    async fn metadata_is_fetched_exactly_once_across_batches() {
        let ctl = controller(
            FakeRasterizer { doc_pages: 6, ceiling: 24, fail: false },
            FakeModel::default(),
        );
        let first = ctl.process_range(&file(), request(1, 2, false)).await.unwrap();
        let second = ctl.process_range(&file(), request(3, 4, true)).await.unwrap();
        assert!(first.metadata_fetched);
        assert!(!second.metadata_fetched);
    }

    #[tokio::test]
    async fn metadata_failure_falls_back_to_file_name_stub() {
        let ctl = controller(
            FakeRasterizer { doc_pages: 2, ceiling: 24, fail: false },
            FakeModel { fail_metadata: true, ..FakeModel::default() },
        );
        let outcome = ctl.process_range(&file(), request(1, 2, false)).await.unwrap();
        assert!(!outcome.metadata_fetched);
        let snap = ctl.document().snapshot();
        assert_eq!(snap.metadata.unwrap().title, "paper");
        // The pipeline still completed.
        assert_eq!(snap.progress, 100);
    }

    #[tokio::test]
    async fn render_failure_aborts_with_no_mutation() {
        let ctl = controller(
            FakeRasterizer { doc_pages: 5, ceiling: 24, fail: true },
            FakeModel::default(),
        );
        let err = ctl.process_range(&file(), request(1, 2, false)).await.unwrap_err();
        assert!(matches!(err, BatchError::Render(RenderError::Unreadable(_))));
        assert_eq!(ctl.document().segment_count(), 0);
        assert!(!ctl.document().metadata_present());
    }

    #[tokio::test]
    async fn empty_range_is_a_noop_error() {
        let ctl = controller(
            FakeRasterizer { doc_pages: 3, ceiling: 24, fail: false },
            FakeModel::default(),
        );
        let err = ctl.process_range(&file(), request(7, 8, true)).await.unwrap_err();
        assert!(matches!(err, BatchError::EmptyRange { start: 7, end: 8 }));
        assert_eq!(ctl.document().segment_count(), 0);
    }

    #[tokio::test]
    async fn malformed_page_mid_batch_degrades_but_completes() {
        let ctl = controller(
            FakeRasterizer { doc_pages: 3, ceiling: 24, fail: false },
            FakeModel { malformed_pages: vec![2], ..FakeModel::default() },
        );
        let outcome = ctl.process_range(&file(), request(1, 3, false)).await.unwrap();
        assert_eq!(outcome.pages, vec![1, 2, 3]);
        let doc = ctl.document();
        assert_eq!(doc.progress(), 100);

        let pages = doc.group_by_page();
        assert_eq!(pages[0].1.len(), 2); // page 1 normal
        assert_eq!(pages[1].1.len(), 1); // page 2 single error marker
        assert!(pages[1].1[0].original.contains("could not be parsed"));
        assert_eq!(pages[2].1.len(), 2); // page 3 normal
    }

    #[tokio::test]
    async fn request_failure_keeps_prior_pages_and_resets_progress() {
        let ctl = controller(
            FakeRasterizer { doc_pages: 3, ceiling: 24, fail: false },
            FakeModel { failing_pages: vec![3], ..FakeModel::default() },
        );
        let err = ctl.process_range(&file(), request(1, 3, false)).await.unwrap_err();
        assert!(matches!(err, BatchError::Request(_)));

        let doc = ctl.document();
        // Pages 1 and 2 survived the abort.
        assert_eq!(doc.distinct_processed_pages(), vec![1, 2]);
        assert_eq!(doc.progress(), 0);
    }

    #[tokio::test]
    async fn progress_is_monotonic_within_a_batch() {
        let ctl = controller(
            FakeRasterizer { doc_pages: 4, ceiling: 24, fail: false },
            FakeModel::default(),
        );
        let mut rx = ctl.subscribe();
        ctl.process_range(&file(), request(1, 4, false)).await.unwrap();

        let mut values = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let PipelineEvent::Progress { value } = event {
                values.push(value);
            }
        }
        assert!(values.windows(2).all(|w| w[0] <= w[1]), "non-monotonic: {values:?}");
        assert_eq!(values.last().copied(), Some(100));
        assert!(values.contains(&METADATA_PROGRESS));
    }

    #[tokio::test]
    async fn reanalysis_replaces_only_the_target_page() {
        let ctl = controller(
            FakeRasterizer { doc_pages: 5, ceiling: 24, fail: false },
            FakeModel::default(),
        );
        ctl.process_range(&file(), request(1, 5, false)).await.unwrap();
        let doc = ctl.document().clone();
        let before = doc.snapshot();
        let page3_before: Vec<String> = before
            .segments
            .iter()
            .filter(|s| s.page_index == 3)
            .map(|s| s.id.clone())
            .collect();

        // Different simulated output on the second pass.
        let ctl2 = PageBatchController::new(
            Arc::new(FakeRasterizer { doc_pages: 5, ceiling: 24, fail: false }),
            Arc::new(FakeModel { variant: "-v2", ..FakeModel::default() }),
            doc.clone(),
        );
        let outcome = ctl2.process_range(&file(), request(3, 3, true)).await.unwrap();
        assert_eq!(outcome.pages, vec![3]);

        let after = doc.snapshot();
        assert_eq!(after.segments.len(), before.segments.len());
        for s in after.segments.iter().filter(|s| s.page_index == 3) {
            assert!(!page3_before.contains(&s.id), "page 3 ids must be fresh");
            assert!(s.original.ends_with("-v2"));
        }
        // Other pages untouched.
        for page in [1u32, 2, 4, 5] {
            let originals: Vec<&str> = after
                .segments
                .iter()
                .filter(|s| s.page_index == page)
                .map(|s| s.original.as_str())
                .collect();
            assert!(originals.iter().all(|o| !o.ends_with("-v2")));
        }
        // Appended range fragment for the single page.
        assert_eq!(doc.active_range(), "1-5, 3");
    }

    #[tokio::test]
    async fn truncated_full_document_request_is_reported() {
        let ctl = controller(
            FakeRasterizer { doc_pages: 40, ceiling: 6, fail: false },
            FakeModel::default(),
        );
        let doc = ctl.document().clone();
        doc.set_page_count_once(doc.epoch(), 40);
        let outcome = ctl
            .process_range(&file(), request(1, UNBOUNDED_END, false))
            .await
            .unwrap();
        assert!(outcome.truncated);
        assert_eq!(outcome.pages.len(), 6);
        assert_eq!(doc.active_range(), "1-6");
    }

    #[tokio::test]
    async fn pages_are_requested_in_order_one_at_a_time() {
        let model = FakeModel::default();
        let ctl = controller(FakeRasterizer { doc_pages: 4, ceiling: 24, fail: false }, model);
        ctl.process_range(&file(), request(2, 4, false)).await.unwrap();
        // Downcast trick not needed: order is observable through merge order.
        assert_eq!(ctl.document().distinct_processed_pages(), vec![2, 3, 4]);
        // Page 1 was rendered for metadata but not translated.
        assert!(ctl
            .document()
            .group_by_page()
            .iter()
            .all(|(page, _)| *page >= 2));
    }
}
