//! Document upload — the only "cancel everything" operation: accepting a new
//! file clears the whole collection, metadata, watermark and active range.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use tracing::info;

use diptych_core::FileHandle;

use crate::error::ApiError;
use crate::state::SharedState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub file_name: String,
    pub pages: u32,
}

pub async fn upload(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut file_name = "document.pdf".to_string();
    let mut bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed upload: {e}")))?
    {
        if field.name() == Some("file") {
            if let Some(name) = field.file_name() {
                file_name = name.to_string();
            }
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("upload read failed: {e}")))?;
            bytes = Some(data.to_vec());
        }
    }

    let Some(bytes) = bytes else {
        return Err(ApiError::bad_request("missing \"file\" field"));
    };

    // New document: everything from the previous session is discarded and
    // any still-running batch completes into the void (stale epoch).
    let epoch = state.doc.reset();
    let handle = FileHandle::new(file_name.clone(), bytes);

    // Total page count is fetched once, independent of processing; an
    // unreadable file fails the upload here, before anything is stored.
    let pages = state
        .rasterizer
        .page_count(handle.bytes.as_ref().clone())
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    state.doc.set_page_count_once(epoch, pages);

    *state.file.write().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    info!(file = %file_name, pages, "document accepted");

    Ok(Json(UploadResponse { file_name, pages }))
}
