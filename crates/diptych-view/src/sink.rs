//! Rendering-surface abstraction shared by the embedded pane and the
//! detached viewer: both consume the same projections of the document model,
//! parameterized only by the surface handle behind the trait.

use diptych_common::PageImage;

pub trait ViewSink {
    /// Replace the surface's content with these page renders. The detached
    /// viewer calls this with the full page list every time it (re)opens.
    fn render_pages(&mut self, pages: &[PageImage]);

    /// Apply a normalized scroll fraction forwarded from the host pane.
    fn apply_fraction(&mut self, fraction: f64);

    /// Drop the surface's subscription; called when either side closes.
    fn teardown(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal sink capturing what was pushed to it.
    #[derive(Default)]
    struct RecordingSink {
        pages: Vec<u32>,
        fraction: Option<f64>,
        torn_down: bool,
    }

    impl ViewSink for RecordingSink {
        fn render_pages(&mut self, pages: &[PageImage]) {
            self.pages = pages.iter().map(|p| p.page_index).collect();
        }

        fn apply_fraction(&mut self, fraction: f64) {
            self.fraction = Some(fraction);
        }

        fn teardown(&mut self) {
            self.torn_down = true;
        }
    }

    #[test]
    fn sink_receives_full_page_list_and_fractions() {
        let mut sink = RecordingSink::default();
        let pages: Vec<PageImage> =
            (1..=3).map(|i| PageImage::new(i, Vec::new(), 10, 10)).collect();
        sink.render_pages(&pages);
        sink.apply_fraction(0.5);
        assert_eq!(sink.pages, vec![1, 2, 3]);
        assert_eq!(sink.fraction, Some(0.5));
        sink.teardown();
        assert!(sink.torn_down);
    }
}
