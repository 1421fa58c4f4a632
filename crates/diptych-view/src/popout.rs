//! Lifecycle state machine for the detached pop-out viewer.
//!
//! The detached surface owns its own document context, so every entry into
//! `Open` requires a from-scratch render of the page bitmaps. Closing either
//! side tears down the other side's subscription.

use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PopoutState {
    #[default]
    Closed,
    Opening,
    Open,
    /// The detached window was closed by the user on its own side.
    ClosedByRemote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopoutEvent {
    /// Host-side user asked for the pop-out.
    OpenRequested,
    /// The detached surface finished loading and can accept renders.
    SurfaceReady,
    /// Host-side user closed the pop-out.
    CloseRequested,
    /// The detached window reported it was closed remotely.
    RemoteClosed,
    /// The host view itself is being torn down.
    HostTeardown,
}

#[derive(Debug, Default)]
pub struct PopoutWindow {
    state: PopoutState,
}

impl PopoutWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PopoutState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == PopoutState::Open
    }

    /// Apply one transition. Returns the new state, or `None` when the event
    /// is not valid in the current state (stale messages from an already
    /// closed surface are expected and ignored).
    pub fn apply(&mut self, event: PopoutEvent) -> Option<PopoutState> {
        use PopoutEvent::*;
        use PopoutState::*;

        let next = match (self.state, event) {
            (Closed | ClosedByRemote, OpenRequested) => Opening,
            (Opening, SurfaceReady)                  => Open,
            (Opening | Open, CloseRequested)         => Closed,
            (Open, RemoteClosed)                     => ClosedByRemote,
            (_, HostTeardown)                        => Closed,
            _ => return None,
        };
        debug!(from = ?self.state, to = ?next, ?event, "popout transition");
        self.state = next;
        Some(next)
    }

    /// The detached surface must re-render everything after this transition.
    pub fn needs_full_render(&self, just_applied: PopoutEvent) -> bool {
        self.state == PopoutState::Open && just_applied == PopoutEvent::SurfaceReady
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PopoutEvent::*;
    use PopoutState::*;

    #[test]
    fn happy_path_open_and_close() {
        let mut w = PopoutWindow::new();
        assert_eq!(w.apply(OpenRequested), Some(Opening));
        assert_eq!(w.apply(SurfaceReady), Some(Open));
        assert!(w.is_open());
        assert_eq!(w.apply(CloseRequested), Some(Closed));
    }

    #[test]
    fn remote_close_is_distinct_and_reopenable() {
        let mut w = PopoutWindow::new();
        w.apply(OpenRequested);
        w.apply(SurfaceReady);
        assert_eq!(w.apply(RemoteClosed), Some(ClosedByRemote));
        // The user can open it again.
        assert_eq!(w.apply(OpenRequested), Some(Opening));
    }

    #[test]
    fn stale_events_are_ignored() {
        let mut w = PopoutWindow::new();
        assert_eq!(w.apply(SurfaceReady), None);
        assert_eq!(w.apply(RemoteClosed), None);
        assert_eq!(w.state(), Closed);
        w.apply(OpenRequested);
        // Double open while opening is stale.
        assert_eq!(w.apply(OpenRequested), None);
    }

    #[test]
    fn host_teardown_closes_from_any_state() {
        for setup in [vec![], vec![OpenRequested], vec![OpenRequested, SurfaceReady]] {
            let mut w = PopoutWindow::new();
            for e in setup {
                w.apply(e);
            }
            assert_eq!(w.apply(HostTeardown), Some(Closed));
        }
    }

    #[test]
    fn full_render_required_exactly_on_surface_ready() {
        let mut w = PopoutWindow::new();
        w.apply(OpenRequested);
        assert!(!w.needs_full_render(OpenRequested));
        w.apply(SurfaceReady);
        assert!(w.needs_full_render(SurfaceReady));
    }
}
