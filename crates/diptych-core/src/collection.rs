//! Segment collection model: the single mutable shared resource of the
//! pipeline.
//!
//! All mutation happens inside one write-lock section, so readers never
//! observe a page half-replaced. Every pipeline-driven write carries the
//! epoch it was started under; a write with a stale epoch (the document was
//! reset or replaced in the meantime) is a silent no-op, so in-flight batch
//! completions cannot resurrect a discarded document.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tracing::debug;

use crate::client::Explanation;
use crate::metadata::PaperMetadata;
use crate::segment::Segment;

#[derive(Debug, Default)]
struct DocumentState {
    segments: Vec<Segment>,
    metadata: Option<PaperMetadata>,
    progress: u8,
    watermark: u32,
    page_count: u32,
    active_range: String,
    epoch: u64,
}

/// Point-in-time copy of everything a rendering surface needs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentSnapshot {
    pub metadata: Option<PaperMetadata>,
    pub segments: Vec<Segment>,
    pub progress: u8,
    pub watermark: u32,
    pub page_count: u32,
    pub active_range: String,
    pub epoch: u64,
}

#[derive(Debug, Default)]
pub struct DocumentModel {
    state: RwLock<DocumentState>,
}

impl DocumentModel {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, DocumentState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, DocumentState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn epoch(&self) -> u64 {
        self.read().epoch
    }

    /// Discard everything and start a new document session. Returns the new
    /// epoch; writes carrying an older epoch become no-ops.
    pub fn reset(&self) -> u64 {
        let mut state = self.write();
        *state = DocumentState {
            epoch: state.epoch + 1,
            ..DocumentState::default()
        };
        state.epoch
    }

    // ── Pipeline writes (epoch-guarded) ───────────────────────────────────────

    /// Page-replacement merge: drop every segment of `page_index`, then append
    /// `new_segments` in the order given. Atomic with respect to readers.
    pub fn merge_page(&self, epoch: u64, page_index: u32, new_segments: Vec<Segment>) -> bool {
        let mut state = self.write();
        if state.epoch != epoch {
            debug!(page = page_index, "merge dropped, document was reset");
            return false;
        }
        state.segments.retain(|s| s.page_index != page_index);
        state.segments.extend(new_segments);
        true
    }

    /// First successful extraction wins; later batches never replace it.
    pub fn set_metadata_once(&self, epoch: u64, metadata: PaperMetadata) -> bool {
        let mut state = self.write();
        if state.epoch != epoch || state.metadata.is_some() {
            return false;
        }
        state.metadata = Some(metadata);
        true
    }

    pub fn set_progress(&self, epoch: u64, value: u8) {
        let mut state = self.write();
        if state.epoch == epoch {
            state.progress = value.min(100);
        }
    }

    pub fn raise_watermark(&self, epoch: u64, page: u32) {
        let mut state = self.write();
        if state.epoch == epoch {
            state.watermark = state.watermark.max(page);
        }
    }

    pub fn set_page_count_once(&self, epoch: u64, count: u32) {
        let mut state = self.write();
        if state.epoch == epoch && state.page_count == 0 {
            state.page_count = count;
        }
    }

    pub fn replace_active_range(&self, epoch: u64, descriptor: String) {
        let mut state = self.write();
        if state.epoch == epoch {
            state.active_range = descriptor;
        }
    }

    pub fn append_active_range(&self, epoch: u64, fragment: &str) {
        let mut state = self.write();
        if state.epoch != epoch {
            return;
        }
        if state.active_range.is_empty() {
            state.active_range = fragment.to_string();
        } else {
            state.active_range.push_str(", ");
            state.active_range.push_str(fragment);
        }
    }

    // ── Readers ───────────────────────────────────────────────────────────────

    pub fn metadata_present(&self) -> bool {
        self.read().metadata.is_some()
    }

    pub fn progress(&self) -> u8 {
        self.read().progress
    }

    pub fn watermark(&self) -> u32 {
        self.read().watermark
    }

    pub fn page_count(&self) -> u32 {
        self.read().page_count
    }

    pub fn active_range(&self) -> String {
        self.read().active_range.clone()
    }

    pub fn segment_count(&self) -> usize {
        self.read().segments.len()
    }

    /// Ascending-page grouping for rendering. Within-page order is insertion
    /// order; it is never resorted here.
    pub fn group_by_page(&self) -> Vec<(u32, Vec<Segment>)> {
        let state = self.read();
        let mut grouped: BTreeMap<u32, Vec<Segment>> = BTreeMap::new();
        for segment in &state.segments {
            grouped.entry(segment.page_index).or_default().push(segment.clone());
        }
        grouped.into_iter().collect()
    }

    /// Sorted set of page indices currently holding segments.
    pub fn distinct_processed_pages(&self) -> Vec<u32> {
        let state = self.read();
        let mut pages: Vec<u32> = state.segments.iter().map(|s| s.page_index).collect();
        pages.sort_unstable();
        pages.dedup();
        pages
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        let state = self.read();
        DocumentSnapshot {
            metadata: state.metadata.clone(),
            segments: state.segments.clone(),
            progress: state.progress,
            watermark: state.watermark,
            page_count: state.page_count,
            active_range: state.active_range.clone(),
            epoch: state.epoch,
        }
    }

    // ── Annotation mutators ───────────────────────────────────────────────────
    //
    // Addressed by segment id; a stale id (the page was re-analyzed since the
    // caller last rendered) is a silent no-op and the caller re-keys off the
    // next snapshot.

    pub fn toggle_bookmark(&self, id: &str) -> bool {
        self.update_segment(id, |s| s.is_bookmarked = !s.is_bookmarked)
    }

    pub fn set_note(&self, id: &str, note: &str) -> bool {
        let note = note.to_string();
        self.update_segment(id, move |s| {
            s.user_note = if note.is_empty() { None } else { Some(note) };
        })
    }

    pub fn set_explaining(&self, id: &str, in_flight: bool) -> bool {
        self.update_segment(id, |s| s.is_explaining = in_flight)
    }

    pub fn set_explanation(&self, id: &str, explanation: Explanation) -> bool {
        self.update_segment(id, move |s| {
            s.explanation = Some(explanation.korean);
            s.explanation_en = Some(explanation.english);
            s.is_explaining = false;
        })
    }

    fn update_segment(&self, id: &str, apply: impl FnOnce(&mut Segment)) -> bool {
        let mut state = self.write();
        match state.segments.iter_mut().find(|s| s.id == id) {
            Some(segment) => {
                apply(segment);
                true
            }
            None => {
                debug!(segment = id, "mutation dropped, id no longer present");
                false
            }
        }
    }
}
