//! Pipeline milestones published on a broadcast channel while a batch runs.
//! The web layer forwards these to connected clients.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    BatchStarted { start: u32, end: u32, append: bool },
    MetadataReady { title: String, fallback: bool },
    Progress { value: u8 },
    PageMerged { page: u32, segments: usize },
    BatchCompleted { pages: Vec<u32>, range: String },
    BatchFailed { message: String },
}
