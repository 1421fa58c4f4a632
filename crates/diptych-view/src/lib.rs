//! Twin-view support: normalized scroll synchronization between two
//! independently scrollable surfaces, and the lifecycle state machine for
//! the detached pop-out viewer.

pub mod popout;
pub mod scroll;
pub mod sink;

pub use popout::{PopoutEvent, PopoutState, PopoutWindow};
pub use scroll::{
    apply_fraction, scroll_fraction, ContentMode, Pane, PaneSync, ScrollMetrics, SyncGuard,
    SYNC_COOLDOWN,
};
pub use sink::ViewSink;
