//! Time windows over a recording.

use serde::Serialize;

/// A `[start, end)` time window in seconds.
///
/// An `end` of zero leaves the window unbounded above.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

impl TimeWindow {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_bounded(&self) -> bool {
        self.end != 0.0
    }

    /// Inclusive lower bound, used when selecting samples.
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && self.before_end(time)
    }

    /// Exclusive lower bound, used when selecting cycles by their start time.
    pub fn contains_after(&self, time: f64) -> bool {
        time > self.start && self.before_end(time)
    }

    #[inline(always)]
    fn before_end(&self, time: f64) -> bool {
        !self.is_bounded() || time < self.end
    }
}

#[test]
fn window_bounds() {
    let window = TimeWindow::new(1.0, 2.0);
    assert!(window.contains(1.0));
    assert!(!window.contains_after(1.0));
    assert!(window.contains_after(1.5));
    assert!(!window.contains(2.0));

    let open = TimeWindow::unbounded();
    assert!(!open.is_bounded());
    assert!(open.contains(0.0));
    assert!(!open.contains_after(0.0));
    assert!(open.contains_after(1e9));
}
