//! Read-side projection of the document model plus annotation mutators.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use diptych_core::{PaperMetadata, Segment};

use crate::error::ApiError;
use crate::state::SharedState;

#[derive(Debug, Serialize)]
pub struct PageGroup {
    pub page: u32,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Serialize)]
pub struct SegmentsResponse {
    pub metadata: Option<PaperMetadata>,
    pub progress: u8,
    pub watermark: u32,
    pub page_count: u32,
    pub active_range: String,
    pub processed_pages: Vec<u32>,
    pub pages: Vec<PageGroup>,
}

/// Everything both rendering surfaces need, grouped by ascending page.
pub async fn list(State(state): State<SharedState>) -> Json<SegmentsResponse> {
    let snapshot = state.doc.snapshot();
    let pages = state
        .doc
        .group_by_page()
        .into_iter()
        .map(|(page, segments)| PageGroup { page, segments })
        .collect();

    Json(SegmentsResponse {
        metadata: snapshot.metadata,
        progress: snapshot.progress,
        watermark: snapshot.watermark,
        page_count: snapshot.page_count,
        active_range: snapshot.active_range,
        processed_pages: state.doc.distinct_processed_pages(),
        pages,
    })
}

#[derive(Debug, Serialize)]
pub struct MutationResponse {
    /// False when the id went stale (page re-analyzed since the client
    /// rendered); the client re-keys off the next fetch.
    pub updated: bool,
}

pub async fn toggle_bookmark(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Json<MutationResponse> {
    Json(MutationResponse { updated: state.doc.toggle_bookmark(&id) })
}

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    #[serde(default)]
    pub note: String,
}

pub async fn set_note(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(request): Json<NoteRequest>,
) -> Result<Json<MutationResponse>, ApiError> {
    Ok(Json(MutationResponse { updated: state.doc.set_note(&id, &request.note) }))
}
