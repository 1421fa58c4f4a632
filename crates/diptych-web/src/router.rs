//! Axum router — maps all URL paths to handlers.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{assist, auth, documents, segments, translate, view};
use crate::sse::sse_handler;
use crate::state::SharedState;

/// Uploads carry whole PDFs.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Build and return the full Axum router.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        // Document lifecycle + batches
        .route("/api/documents",           post(documents::upload))
        .route("/api/documents/translate", post(translate::start))
        .route("/api/documents/next",      post(translate::next_batch))
        .route("/api/documents/pages/{page}",           post(translate::open_page))
        .route("/api/documents/pages/{page}/reanalyze", post(translate::reanalyze))
        .route("/api/documents/segments",  get(segments::list))

        // Per-segment actions
        .route("/api/segments/{id}/bookmark", post(segments::toggle_bookmark))
        .route("/api/segments/{id}/note",     post(segments::set_note))
        .route("/api/segments/{id}/explain",  post(assist::explain))

        // Assist
        .route("/api/chat", post(assist::chat))

        // SSE streaming
        .route("/api/events", get(sse_handler))

        // View sync
        .route("/api/view/scroll",         post(view::scroll))
        .route("/api/view/popout/{event}", post(view::popout))

        // Accounts
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login",    post(auth::login))
        .route("/api/auth/approve",  post(auth::approve))
        .route("/api/auth/pending",  get(auth::pending))

        // Middleware
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
