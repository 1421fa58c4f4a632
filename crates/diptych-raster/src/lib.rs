//! pdfium-backed implementation of the `PageRasterizer` port.
//!
//! pdfium has global C state and its handles are not `Send`, so every call
//! binds and renders entirely inside one `spawn_blocking` closure; nothing
//! pdfium-owned ever crosses a thread boundary.

use std::io::Cursor;

use async_trait::async_trait;
use image::ImageFormat;
use pdfium_render::prelude::{PdfRenderConfig, Pdfium};
use tracing::debug;

use diptych_common::{PageImage, PageRasterizer, RenderError};

/// Upscale factor applied to every page render. Chosen for model legibility
/// versus request payload size.
pub const DEFAULT_RENDER_SCALE: f32 = 2.0;

/// Hard ceiling on pages rendered per call — the cost-control knob that also
/// bounds "translate the whole document".
pub const DEFAULT_PAGE_CEILING: u32 = 24;

#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    scale: f32,
    page_ceiling: u32,
}

impl Default for PdfiumRasterizer {
    fn default() -> Self {
        Self { scale: DEFAULT_RENDER_SCALE, page_ceiling: DEFAULT_PAGE_CEILING }
    }
}

impl PdfiumRasterizer {
    pub fn new(scale: f32, page_ceiling: u32) -> Self {
        Self {
            scale: if scale > 0.0 { scale } else { DEFAULT_RENDER_SCALE },
            page_ceiling: page_ceiling.max(1),
        }
    }

    pub fn page_ceiling(&self) -> u32 {
        self.page_ceiling
    }
}

#[async_trait]
impl PageRasterizer for PdfiumRasterizer {
    async fn render_pages(
        &self,
        data: Vec<u8>,
        max_page: u32,
    ) -> Result<Vec<PageImage>, RenderError> {
        let cap = self.page_ceiling.min(max_page.max(1));
        let scale = self.scale;
        tokio::task::spawn_blocking(move || render_blocking(&data, cap, scale))
            .await
            .map_err(|e| RenderError::Render(format!("render task aborted: {e}")))?
    }

    async fn page_count(&self, data: Vec<u8>) -> Result<u32, RenderError> {
        tokio::task::spawn_blocking(move || page_count_blocking(&data))
            .await
            .map_err(|e| RenderError::Render(format!("render task aborted: {e}")))?
    }
}

fn bind_pdfium() -> Result<Pdfium, RenderError> {
    Pdfium::bind_to_system_library()
        .or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./lib/"))
        })
        .map(Pdfium::new)
        .map_err(|e| RenderError::Render(format!("pdfium library unavailable: {e}")))
}

fn render_blocking(data: &[u8], cap: u32, scale: f32) -> Result<Vec<PageImage>, RenderError> {
    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_byte_slice(data, None)
        .map_err(|e| RenderError::Unreadable(e.to_string()))?;

    let total = document.pages().len() as u32;
    let upto = total.min(cap);
    debug!(total, upto, scale, "rasterizing pages");

    let config = PdfRenderConfig::new()
        .scale_page_by_factor(scale)
        .render_form_data(false)
        .render_annotations(false);

    let mut out = Vec::with_capacity(upto as usize);
    for (index, page) in document.pages().iter().enumerate() {
        let page_index = index as u32 + 1;
        if page_index > upto {
            break;
        }
        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| RenderError::Render(format!("page {page_index}: {e}")))?;

        // JPEG carries no alpha channel; flatten before encoding.
        let rgb = bitmap.as_image().to_rgb8();
        let (width, height) = rgb.dimensions();
        let mut jpeg = Vec::new();
        rgb.write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
            .map_err(|e| RenderError::Render(format!("page {page_index} encode: {e}")))?;

        out.push(PageImage::new(page_index, jpeg, width, height));
    }
    Ok(out)
}

fn page_count_blocking(data: &[u8]) -> Result<u32, RenderError> {
    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_byte_slice(data, None)
        .map_err(|e| RenderError::Unreadable(e.to_string()))?;
    Ok(document.pages().len() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let raster = PdfiumRasterizer::default();
        assert_eq!(raster.scale, DEFAULT_RENDER_SCALE);
        assert_eq!(raster.page_ceiling(), DEFAULT_PAGE_CEILING);
    }

    #[test]
    fn constructor_rejects_degenerate_values() {
        let raster = PdfiumRasterizer::new(0.0, 0);
        assert_eq!(raster.scale, DEFAULT_RENDER_SCALE);
        assert_eq!(raster.page_ceiling(), 1);
    }
}
