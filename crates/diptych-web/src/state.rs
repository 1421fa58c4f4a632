//! Shared application state and the app-event fan-out.

use std::sync::{Arc, Mutex, RwLock};

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use diptych_common::PageRasterizer;
use diptych_core::{
    DocumentModel, FileHandle, ModelClient, PageBatchController, PipelineEvent, ProgressiveLoader,
    Tone,
};
use diptych_store::AccountStore;
use diptych_view::{PaneSync, PopoutState, PopoutWindow};

/// Events pushed to connected clients via SSE.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    BatchStarted { start: u32, end: u32, append: bool },
    MetadataReady { title: String, fallback: bool },
    Progress { value: u8 },
    PageMerged { page: u32, segments: usize },
    BatchCompleted { pages: Vec<u32>, range: String },
    BatchFailed { message: String },
    SegmentExplained { id: String },
    /// Normalized scroll fraction for the detached viewer to apply.
    ScrollSync { fraction: f64 },
    PopoutChanged { state: PopoutState },
    Notification { level: String, message: String },
}

impl From<PipelineEvent> for AppEvent {
    fn from(event: PipelineEvent) -> Self {
        match event {
            PipelineEvent::BatchStarted { start, end, append } => {
                AppEvent::BatchStarted { start, end, append }
            }
            PipelineEvent::MetadataReady { title, fallback } => {
                AppEvent::MetadataReady { title, fallback }
            }
            PipelineEvent::Progress { value } => AppEvent::Progress { value },
            PipelineEvent::PageMerged { page, segments } => {
                AppEvent::PageMerged { page, segments }
            }
            PipelineEvent::BatchCompleted { pages, range } => {
                AppEvent::BatchCompleted { pages, range }
            }
            PipelineEvent::BatchFailed { message } => AppEvent::BatchFailed { message },
        }
    }
}

/// Shared state injected into every handler.
pub struct AppState {
    pub doc: Arc<DocumentModel>,
    pub controller: Arc<PageBatchController>,
    pub loader: ProgressiveLoader,
    pub rasterizer: Arc<dyn PageRasterizer>,
    pub model: Arc<dyn ModelClient>,
    pub accounts: AccountStore,
    /// The uploaded source document, replaced on every upload.
    pub file: RwLock<Option<FileHandle>>,
    pub pane_sync: Mutex<PaneSync>,
    pub popout: Mutex<PopoutWindow>,
    pub default_tone: Tone,
    pub event_tx: broadcast::Sender<AppEvent>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        rasterizer: Arc<dyn PageRasterizer>,
        model: Arc<dyn ModelClient>,
        accounts: AccountStore,
        default_tone: Tone,
    ) -> SharedState {
        let doc = Arc::new(DocumentModel::new());
        let controller = Arc::new(PageBatchController::new(
            rasterizer.clone(),
            model.clone(),
            doc.clone(),
        ));
        let loader = ProgressiveLoader::new(controller.clone(), doc.clone());
        let (event_tx, _) = broadcast::channel(256);

        let state = Arc::new(Self {
            doc,
            controller,
            loader,
            rasterizer,
            model,
            accounts,
            file: RwLock::new(None),
            pane_sync: Mutex::new(PaneSync::new()),
            popout: Mutex::new(PopoutWindow::new()),
            default_tone,
            event_tx,
        });
        spawn_event_bridge(&state);
        state
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.event_tx.subscribe()
    }

    pub fn emit(&self, event: AppEvent) {
        let _ = self.event_tx.send(event);
    }

    pub fn notify(&self, level: &str, message: impl Into<String>) {
        self.emit(AppEvent::Notification { level: level.to_string(), message: message.into() });
    }

    pub fn current_file(&self) -> Option<FileHandle> {
        self.file.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Forward pipeline events onto the app-event channel for SSE clients.
fn spawn_event_bridge(state: &SharedState) {
    let mut rx = state.controller.subscribe();
    let state = state.clone();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => state.emit(AppEvent::from(event)),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    debug!(missed, "event bridge lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
