use serde::{Deserialize, Serialize};

/// One rasterized page, ready for submission to a vision model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageImage {
    /// 1-based page number within the source document.
    pub page_index: u32,
    /// JPEG-encoded render at the adapter's fixed upscale factor.
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl PageImage {
    pub fn new(page_index: u32, jpeg: Vec<u8>, width: u32, height: u32) -> Self {
        Self { page_index, jpeg, width, height }
    }
}
