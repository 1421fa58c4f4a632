//! Segment explanations and document-context chat. Both are best-effort
//! model calls that never touch the page pipeline.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;

use diptych_core::ChatMessage;

use crate::error::ApiError;
use crate::state::{AppEvent, SharedState};

#[derive(Debug, Deserialize, Default)]
pub struct ExplainRequest {
    pub user_prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExplainStarted {
    pub status: &'static str,
    pub id: String,
}

/// Kick off an explanation for one segment. The in-flight flag is set
/// immediately; the result lands on the segment (and an event fires) when
/// the request completes. A re-analysis in the meantime simply drops the
/// result on the stale id.
pub async fn explain(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(request): Json<ExplainRequest>,
) -> Result<Json<ExplainStarted>, ApiError> {
    let snapshot = state.doc.snapshot();
    let Some(segment) = snapshot.segments.iter().find(|s| s.id == id).cloned() else {
        return Err(ApiError::not_found(format!("no segment {id}")));
    };

    state.doc.set_explaining(&id, true);

    let task_state = state.clone();
    let task_id = id.clone();
    tokio::spawn(async move {
        let result = task_state
            .model
            .explain_block(
                &segment.original,
                &segment.translated,
                request.user_prompt.as_deref(),
            )
            .await;
        match result {
            Ok(explanation) => {
                if task_state.doc.set_explanation(&task_id, explanation) {
                    task_state.emit(AppEvent::SegmentExplained { id: task_id });
                }
            }
            Err(err) => {
                warn!(segment = %task_id, error = %err, "explanation request failed");
                task_state.doc.set_explaining(&task_id, false);
                task_state.notify("error", format!("explanation failed: {err}"));
            }
        }
    });

    Ok(Json(ExplainStarted { status: "started", id }))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

pub async fn chat(
    State(state): State<SharedState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let context = document_context(&state);
    let reply = state
        .model
        .chat_turn(&request.history, &request.message, &context)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(ChatResponse { reply }))
}

/// Compact paper context for the chat system prompt.
fn document_context(state: &SharedState) -> String {
    let snapshot = state.doc.snapshot();
    match snapshot.metadata {
        Some(meta) => format!(
            "{} ({}) — {} — translated pages: {}",
            meta.title,
            meta.year.as_deref().unwrap_or("n.d."),
            meta.authors.join(", "),
            snapshot.active_range,
        ),
        None => "No paper metadata available yet.".to_string(),
    }
}
