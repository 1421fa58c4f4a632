//! View synchronization: twin-pane scroll forwarding and the detached
//! viewer lifecycle.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use diptych_view::{scroll_fraction, Pane, PopoutEvent, PopoutState, ScrollMetrics};

use crate::error::ApiError;
use crate::state::{AppEvent, SharedState};

#[derive(Debug, Deserialize)]
pub struct ScrollRequest {
    pub pane: Pane,
    pub source: ScrollMetrics,
    pub target: ScrollMetrics,
}

#[derive(Debug, Serialize)]
pub struct ScrollResponse {
    /// scroll_top for the opposite embedded pane; absent when the event was
    /// an echo, the modes differ, or there is nothing to scroll.
    pub apply: Option<f64>,
    /// Fraction forwarded to the detached viewer, when one is open.
    pub forwarded: Option<f64>,
}

/// A scroll event from one embedded pane: maybe mirror it onto the twin
/// pane, and forward the normalized fraction to the detached viewer.
pub async fn scroll(
    State(state): State<SharedState>,
    Json(request): Json<ScrollRequest>,
) -> Json<ScrollResponse> {
    let apply = state
        .pane_sync
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .on_scroll(request.pane, request.source, request.target);

    // The detached viewer is strictly one-way: host fraction in, no echo out.
    let mut forwarded = None;
    if request.pane == Pane::Translated
        && state.popout.lock().unwrap_or_else(|e| e.into_inner()).is_open()
    {
        if let Some(fraction) = scroll_fraction(request.source) {
            state.emit(AppEvent::ScrollSync { fraction });
            forwarded = Some(fraction);
        }
    }

    Json(ScrollResponse { apply, forwarded })
}

#[derive(Debug, Serialize)]
pub struct PopoutResponse {
    pub state: PopoutState,
    /// The detached surface must re-render all page bitmaps from scratch.
    pub full_render: bool,
}

/// Drive the popout state machine: open / ready / close / remote-closed /
/// host-teardown.
pub async fn popout(
    State(state): State<SharedState>,
    Path(event): Path<String>,
) -> Result<Json<PopoutResponse>, ApiError> {
    let event = match event.as_str() {
        "open"          => PopoutEvent::OpenRequested,
        "ready"         => PopoutEvent::SurfaceReady,
        "close"         => PopoutEvent::CloseRequested,
        "remote-closed" => PopoutEvent::RemoteClosed,
        "teardown"      => PopoutEvent::HostTeardown,
        other => return Err(ApiError::bad_request(format!("unknown popout event: {other}"))),
    };

    let mut window = state.popout.lock().unwrap_or_else(|e| e.into_inner());
    let Some(new_state) = window.apply(event) else {
        // Stale message from an already-closed surface; report the current
        // state instead of failing.
        return Ok(Json(PopoutResponse { state: window.state(), full_render: false }));
    };
    let full_render = window.needs_full_render(event);
    drop(window);

    state.emit(AppEvent::PopoutChanged { state: new_state });
    Ok(Json(PopoutResponse { state: new_state, full_render }))
}
