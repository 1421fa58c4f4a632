//! Rasterizer port. The concrete pdfium adapter lives in `diptych-raster`;
//! the batch controller only ever sees this trait.

use async_trait::async_trait;

use crate::{PageImage, RenderError};

#[async_trait]
pub trait PageRasterizer: Send + Sync {
    /// Render pages 1..=`max_page` (bounded by the adapter's own page
    /// ceiling) and return them in ascending page order.
    ///
    /// `max_page` is a per-call cost cap, not a hard document limit.
    async fn render_pages(
        &self,
        data: Vec<u8>,
        max_page: u32,
    ) -> Result<Vec<PageImage>, RenderError>;

    /// Total page count of the document, independent of any render cap.
    async fn page_count(&self, data: Vec<u8>) -> Result<u32, RenderError>;
}
