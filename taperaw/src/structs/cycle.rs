//! Recovered signal pulses.

use serde::Serialize;

/// One full oscillation of the recovered signal.
///
/// Times are in seconds from the start of the recording. `max` and `min` are
/// the sample extremes observed between `start` and `end`; cycles loaded from
/// a tape image carry zero extremes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Cycle {
    pub start: f64,
    pub mid: f64,
    pub end: f64,
    pub max: f64,
    pub min: f64,
}

impl Cycle {
    pub fn new(start: f64, mid: f64, end: f64, max: f64, min: f64) -> Self {
        Self {
            start,
            mid,
            end,
            max,
            min,
        }
    }

    /// A cycle known only by its boundaries, with `mid` placed halfway.
    pub fn from_span(start: f64, end: f64) -> Self {
        Self {
            start,
            mid: start + (end - start) / 2.0,
            end,
            max: 0.0,
            min: 0.0,
        }
    }

    /// Pulse length in seconds.
    #[inline(always)]
    pub fn length(&self) -> f64 {
        self.end - self.start
    }
}

#[test]
fn span_midpoint() {
    let cycle = Cycle::from_span(1.0, 1.5);
    assert_eq!(cycle.mid, 1.25);
    assert_eq!(cycle.length(), 0.5);
    assert!(cycle.start <= cycle.mid && cycle.mid <= cycle.end);
}
