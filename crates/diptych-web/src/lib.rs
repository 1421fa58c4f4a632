//! Axum web surface: document upload, batch endpoints, SSE event stream,
//! annotations, explanations, chat, view sync and the account workflow.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod sse;
pub mod state;
