//! Batch endpoints. Batches run in spawned tasks so the request returns
//! immediately; progress and completion arrive over the SSE stream.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use diptych_core::{BatchError, FileHandle, Tone};

use crate::error::ApiError;
use crate::state::SharedState;

#[derive(Debug, Deserialize, Default)]
pub struct StartRequest {
    #[serde(default)]
    pub full_document: bool,
    pub tone: Option<Tone>,
}

#[derive(Debug, Serialize)]
pub struct BatchStarted {
    pub status: &'static str,
    pub range: String,
}

fn require_file(state: &SharedState) -> Result<FileHandle, ApiError> {
    state
        .current_file()
        .ok_or_else(|| ApiError::conflict("no document uploaded"))
}

fn report_background_error(state: &SharedState, err: &BatchError) {
    // Request failures already produced a BatchFailed event inside the
    // controller; the remaining variants surface as a notification.
    if !matches!(err, BatchError::Request(_)) {
        state.notify("error", err.to_string());
    }
}

/// Fresh batch: pages 1-2, or the whole document (bounded by the rasterizer
/// ceiling) when `full_document` is set.
pub async fn start(
    State(state): State<SharedState>,
    Json(request): Json<StartRequest>,
) -> Result<Json<BatchStarted>, ApiError> {
    let file = require_file(&state)?;
    let tone = request.tone.unwrap_or(state.default_tone);
    let range = if request.full_document { "1-".to_string() } else { "1-2".to_string() };

    let task_state = state.clone();
    tokio::spawn(async move {
        if let Err(err) = task_state.loader.start(&file, tone, request.full_document).await {
            report_background_error(&task_state, &err);
        }
    });

    Ok(Json(BatchStarted { status: "started", range }))
}

/// Load-next-batch: watermark+1 .. watermark+2, appended.
pub async fn next_batch(
    State(state): State<SharedState>,
) -> Result<Json<BatchStarted>, ApiError> {
    let file = require_file(&state)?;
    let tone = state.default_tone;
    let (start, end) = state.loader.next_range();

    let task_state = state.clone();
    tokio::spawn(async move {
        if let Err(err) = task_state.loader.load_next(&file, tone).await {
            report_background_error(&task_state, &err);
        }
    });

    Ok(Json(BatchStarted { status: "started", range: format!("{start}-{end}") }))
}

#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PageResponse {
    /// Already processed: the client scrolls, nothing is re-requested.
    ScrollIntoView { page: u32 },
    /// Translation started in the background.
    Translating { page: u32 },
}

/// Page-picker click.
pub async fn open_page(
    State(state): State<SharedState>,
    Path(page): Path<u32>,
) -> Result<Json<PageResponse>, ApiError> {
    if page == 0 {
        return Err(ApiError::bad_request("pages are 1-based"));
    }
    if state.doc.distinct_processed_pages().contains(&page) {
        return Ok(Json(PageResponse::ScrollIntoView { page }));
    }

    let file = require_file(&state)?;
    let tone = state.default_tone;
    let task_state = state.clone();
    tokio::spawn(async move {
        if let Err(err) = task_state.loader.open_page(&file, tone, page).await {
            report_background_error(&task_state, &err);
        }
    });

    Ok(Json(PageResponse::Translating { page }))
}

/// Re-analysis: replaces exactly this page's segments when it completes.
pub async fn reanalyze(
    State(state): State<SharedState>,
    Path(page): Path<u32>,
) -> Result<Json<BatchStarted>, ApiError> {
    if page == 0 {
        return Err(ApiError::bad_request("pages are 1-based"));
    }
    let file = require_file(&state)?;
    let tone = state.default_tone;

    let task_state = state.clone();
    tokio::spawn(async move {
        if let Err(err) = task_state.loader.reanalyze(&file, tone, page).await {
            report_background_error(&task_state, &err);
        }
    });

    Ok(Json(BatchStarted { status: "started", range: page.to_string() }))
}
