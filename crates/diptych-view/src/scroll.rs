//! Normalized scroll-position math and the feedback-loop guard.
//!
//! A scroll applied to the opposite pane fires that pane's own scroll
//! listener; without a guard the two listeners oscillate. Applied scrolls
//! open a short cooldown window during which incoming events from that pane
//! are treated as echoes and dropped.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

pub const SYNC_COOLDOWN: Duration = Duration::from_millis(50);

/// Geometry of one scrollable surface.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
}

/// Position as a fraction of the scrollable track. `None` when the surface
/// has no track to scroll (content fits the viewport).
pub fn scroll_fraction(metrics: ScrollMetrics) -> Option<f64> {
    let track = metrics.scroll_height - metrics.client_height;
    if track <= 0.0 {
        return None;
    }
    Some((metrics.scroll_top / track).clamp(0.0, 1.0))
}

/// Map a fraction onto a target surface's track.
pub fn apply_fraction(fraction: f64, target: ScrollMetrics) -> f64 {
    let track = (target.scroll_height - target.client_height).max(0.0);
    fraction.clamp(0.0, 1.0) * track
}

/// Reentrancy guard for one pane's scroll listener.
#[derive(Debug)]
pub struct SyncGuard {
    cooldown: Duration,
    applied_at: Option<Instant>,
}

impl Default for SyncGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncGuard {
    pub fn new() -> Self {
        Self::with_cooldown(SYNC_COOLDOWN)
    }

    pub fn with_cooldown(cooldown: Duration) -> Self {
        Self { cooldown, applied_at: None }
    }

    /// A programmatic scroll was just applied to this pane.
    pub fn mark_applied(&mut self) {
        self.applied_at = Some(Instant::now());
    }

    /// Whether an incoming event from this pane should be treated as an echo.
    pub fn is_suppressed(&self) -> bool {
        matches!(self.applied_at, Some(at) if at.elapsed() < self.cooldown)
    }
}

/// What a pane is currently rendering. The embedded pair only syncs while
/// both sides show plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentMode {
    Text,
    PageImages,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pane {
    Original,
    Translated,
}

impl Pane {
    fn index(self) -> usize {
        match self {
            Pane::Original   => 0,
            Pane::Translated => 1,
        }
    }

    fn opposite(self) -> Pane {
        match self {
            Pane::Original   => Pane::Translated,
            Pane::Translated => Pane::Original,
        }
    }
}

/// Bidirectional sync for the embedded original/translated pair.
#[derive(Debug)]
pub struct PaneSync {
    modes: [ContentMode; 2],
    guards: [SyncGuard; 2],
}

impl Default for PaneSync {
    fn default() -> Self {
        Self::new()
    }
}

impl PaneSync {
    pub fn new() -> Self {
        Self {
            modes: [ContentMode::Text, ContentMode::Text],
            guards: [SyncGuard::new(), SyncGuard::new()],
        }
    }

    #[cfg(test)]
    fn with_cooldown(cooldown: Duration) -> Self {
        Self {
            modes: [ContentMode::Text, ContentMode::Text],
            guards: [SyncGuard::with_cooldown(cooldown), SyncGuard::with_cooldown(cooldown)],
        }
    }

    pub fn set_mode(&mut self, pane: Pane, mode: ContentMode) {
        self.modes[pane.index()] = mode;
    }

    /// Handle a scroll event from `source`. Returns the `scroll_top` to apply
    /// to the opposite pane, or `None` when the event is an echo, the panes
    /// are in different content modes, or the source has no scrollable track.
    pub fn on_scroll(
        &mut self,
        source: Pane,
        source_metrics: ScrollMetrics,
        target_metrics: ScrollMetrics,
    ) -> Option<f64> {
        if self.modes[0] != ContentMode::Text || self.modes[1] != ContentMode::Text {
            return None;
        }
        if self.guards[source.index()].is_suppressed() {
            return None;
        }
        let fraction = scroll_fraction(source_metrics)?;
        self.guards[source.opposite().index()].mark_applied();
        Some(apply_fraction(fraction, target_metrics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(scroll_top: f64, scroll_height: f64, client_height: f64) -> ScrollMetrics {
        ScrollMetrics { scroll_top, scroll_height, client_height }
    }

    #[test]
    fn fraction_round_trip() {
        let fraction = scroll_fraction(metrics(300.0, 1000.0, 400.0)).unwrap();
        assert!((fraction - 0.5).abs() < f64::EPSILON);
        let applied = apply_fraction(fraction, metrics(0.0, 800.0, 300.0));
        assert!((applied - 250.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_track_yields_no_fraction() {
        assert!(scroll_fraction(metrics(0.0, 400.0, 400.0)).is_none());
        assert!(scroll_fraction(metrics(0.0, 300.0, 400.0)).is_none());
    }

    #[test]
    fn fraction_is_clamped() {
        // Overscroll (rubber-banding) clamps to the track.
        assert_eq!(scroll_fraction(metrics(900.0, 1000.0, 400.0)), Some(1.0));
        assert_eq!(apply_fraction(1.5, metrics(0.0, 800.0, 300.0)), 500.0);
    }

    #[test]
    fn pane_sync_forwards_between_text_panes() {
        let mut sync = PaneSync::with_cooldown(Duration::ZERO);
        let applied = sync.on_scroll(
            Pane::Translated,
            metrics(300.0, 1000.0, 400.0),
            metrics(0.0, 800.0, 300.0),
        );
        assert_eq!(applied, Some(250.0));
    }

    #[test]
    fn pane_sync_suppresses_the_echo() {
        let mut sync = PaneSync::with_cooldown(Duration::from_secs(60));
        let applied = sync
            .on_scroll(
                Pane::Translated,
                metrics(300.0, 1000.0, 400.0),
                metrics(0.0, 800.0, 300.0),
            )
            .unwrap();
        // The applied scroll fires the original pane's listener; that event
        // must not bounce back.
        let echo = sync.on_scroll(
            Pane::Original,
            metrics(applied, 800.0, 300.0),
            metrics(300.0, 1000.0, 400.0),
        );
        assert!(echo.is_none());
        // A genuine scroll from the translated pane still goes through.
        assert!(sync
            .on_scroll(
                Pane::Translated,
                metrics(600.0, 1000.0, 400.0),
                metrics(0.0, 800.0, 300.0),
            )
            .is_some());
    }

    #[test]
    fn pane_sync_requires_matching_text_modes() {
        let mut sync = PaneSync::with_cooldown(Duration::ZERO);
        sync.set_mode(Pane::Original, ContentMode::PageImages);
        let applied = sync.on_scroll(
            Pane::Translated,
            metrics(300.0, 1000.0, 400.0),
            metrics(0.0, 800.0, 300.0),
        );
        assert!(applied.is_none());
    }
}
