use thiserror::Error;

/// Failures raised by the page rasterizer boundary.
///
/// Both variants are fatal to the batch that triggered the render; they are
/// raised before any segment has been merged, so no rollback is needed.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    /// The file itself could not be opened as a PDF.
    #[error("unreadable document: {0}")]
    Unreadable(String),
    /// The document opened but a page failed to rasterize or encode.
    #[error("page render failed: {0}")]
    Render(String),
}

/// Failures raised by the model-client boundary.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error [{status}]: {message}")]
    Api { status: u16, message: String },
    #[error("response parse error: {0}")]
    Parse(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}
