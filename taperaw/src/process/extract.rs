use log::trace;

use crate::structs::cycle::Cycle;
use crate::utils::window::TimeWindow;

/// Extracts [`Cycle`]s from audio samples by locating zero crossings.
///
/// A cycle starts where the signal rises through zero, has its midpoint where
/// it next falls through zero and ends at the following rising crossing, which
/// is also the start of the next cycle. Crossing times are interpolated
/// linearly between the two samples that straddle zero.
///
/// Cycles whose extremes stay within the noise threshold are dropped, but
/// their end still starts the next cycle so boundaries stay contiguous.
///
/// # Example
///
/// ```rust
/// use taperaw::process::extract::CycleExtractor;
///
/// let samples = (0..4410)
///     .map(|i| (i as f32 * 2.0 * std::f32::consts::PI * 1200.0 / 44100.0).sin() - 0.01)
///     .collect::<Vec<_>>();
///
/// let cycles = CycleExtractor::new(&samples, 44100).collect::<Vec<_>>();
/// assert!(cycles.len() > 100);
/// ```
#[derive(Debug, Clone)]
pub struct CycleExtractor<'a> {
    samples: &'a [f32],
    sample_rate: f64,
    window: TimeWindow,
    threshold: f64,
    position: usize,
    state: EdgeState,
}

#[derive(Debug, Clone, Copy)]
struct EdgeState {
    rising: bool,
    previous: f64,
    start: Option<f64>,
    mid: Option<f64>,
    max: f64,
    min: f64,
}

impl Default for EdgeState {
    fn default() -> Self {
        Self {
            rising: false,
            previous: 0.0,
            start: None,
            mid: None,
            max: f64::MIN,
            min: f64::MAX,
        }
    }
}

impl EdgeState {
    fn reset_extremes(&mut self) {
        self.max = f64::MIN;
        self.min = f64::MAX;
    }
}

impl<'a> CycleExtractor<'a> {
    pub fn new(samples: &'a [f32], sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate: sample_rate.max(1) as f64,
            window: TimeWindow::unbounded(),
            threshold: 0.0,
            position: 0,
            state: EdgeState::default(),
        }
    }

    /// Only samples whose time falls in `window` are examined.
    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Index of the next sample to examine.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Restarts extraction from the first sample.
    pub fn reset(&mut self) {
        self.position = 0;
        self.state = EdgeState::default();
    }

    /// Crossing time in samples between `index - 1` and `index`.
    #[inline(always)]
    fn crossing(index: usize, previous: f64, x: f64) -> f64 {
        (index as f64 - 1.0) - previous / (x - previous)
    }

    fn step(&mut self, index: usize, x: f64) -> Option<Cycle> {
        let rate = self.sample_rate;
        let threshold = self.threshold;
        let state = &mut self.state;
        let previous = state.previous;
        let mut emitted = None;

        if x > previous {
            state.rising = true;
        } else if x < previous {
            state.rising = false;
        }

        if state.rising && previous < 0.0 && x >= 0.0 {
            let crossing = Self::crossing(index, previous, x);
            match (state.start, state.mid) {
                (None, _) => {
                    state.reset_extremes();
                    state.start = Some(crossing);
                    trace!("Pulse start at sample {crossing:.3}");
                }
                (Some(start), Some(mid)) => {
                    let end = crossing;
                    if state.max.abs() > threshold || state.min.abs() > threshold {
                        if start <= end {
                            emitted = Some(Cycle::new(
                                start / rate,
                                mid / rate,
                                end / rate,
                                state.max,
                                state.min,
                            ));
                        } else {
                            trace!("Discarding inverted pulse {start:.3}..{end:.3}");
                        }
                    } else {
                        trace!(
                            "Pulse at sample {start:.3} below threshold ({:.4}/{:.4})",
                            state.max, state.min
                        );
                    }

                    state.start = Some(end);
                    state.mid = None;
                    state.reset_extremes();
                }
                (Some(_), None) => {}
            }
        }

        if !state.rising && previous > 0.0 && x <= 0.0 && state.start.is_some() && state.mid.is_none()
        {
            state.mid = Some(Self::crossing(index, previous, x));
        }

        if state.start.is_some() {
            state.max = state.max.max(x);
            state.min = state.min.min(x);
        }

        state.previous = x;
        emitted
    }
}

impl Iterator for CycleExtractor<'_> {
    type Item = Cycle;

    fn next(&mut self) -> Option<Self::Item> {
        while self.position < self.samples.len() {
            let index = self.position;
            self.position += 1;

            if !self.window.contains(index as f64 / self.sample_rate) {
                continue;
            }

            let x = self.samples[index] as f64;
            if let Some(cycle) = self.step(index, x) {
                return Some(cycle);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A square-ish wave: `high` samples at +amp, `low` samples at -amp, repeated.
    fn square(periods: usize, high: usize, low: usize, amp: f32) -> Vec<f32> {
        let mut samples = vec![-amp];
        for _ in 0..periods {
            samples.extend(std::iter::repeat_n(amp, high));
            samples.extend(std::iter::repeat_n(-amp, low));
        }
        samples
    }

    #[test]
    fn interpolated_boundaries() {
        let samples = [-1.0f32, 1.0, 1.0, -1.0, -1.0, 1.0, 1.0, -1.0, -1.0, 1.0];
        let cycles = CycleExtractor::new(&samples, 1).collect::<Vec<_>>();

        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[0].start, 0.5);
        assert_eq!(cycles[0].mid, 2.5);
        assert_eq!(cycles[0].end, 4.5);
        assert_eq!(cycles[0].max, 1.0);
        assert_eq!(cycles[0].min, -1.0);
        assert_eq!(cycles[1].start, cycles[0].end);
        assert_eq!(cycles[1].end, 8.5);
    }

    #[test]
    fn times_in_seconds() {
        let samples = square(4, 5, 5, 0.5);
        let cycles = CycleExtractor::new(&samples, 10_000).collect::<Vec<_>>();

        assert_eq!(cycles.len(), 3);
        for cycle in &cycles {
            assert!((cycle.length() - 0.001).abs() < 1e-12);
            assert!(cycle.start <= cycle.mid && cycle.mid <= cycle.end);
        }
    }

    #[test]
    fn threshold_drops_quiet_pulses() {
        let mut samples = square(3, 4, 4, 0.05);
        samples.extend(square(3, 4, 4, 0.5));

        let all = CycleExtractor::new(&samples, 8).count();
        let loud = CycleExtractor::new(&samples, 8)
            .with_threshold(0.1)
            .collect::<Vec<_>>();

        // The pulse bridging into the loud section sees its -0.5 sample.
        assert_eq!(all, 5);
        assert_eq!(loud.len(), 3);
        for pair in loud.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn no_crossings() {
        let flat = vec![0.25f32; 1000];
        assert_eq!(CycleExtractor::new(&flat, 44100).count(), 0);
        assert_eq!(CycleExtractor::new(&[], 44100).count(), 0);
    }

    #[test]
    fn crossing_on_zero_sample() {
        let samples = [-1.0f32, 0.0, 0.0, 1.0, -1.0, -1.0, 1.0, -1.0, -1.0, 1.0];
        let cycles = CycleExtractor::new(&samples, 1).collect::<Vec<_>>();
        assert_eq!(cycles[0].start, 1.0);
    }

    #[test]
    fn window_limits_samples() {
        let samples = square(10, 5, 5, 0.5);
        let full = CycleExtractor::new(&samples, 10).count();
        let windowed = CycleExtractor::new(&samples, 10)
            .with_window(TimeWindow::new(2.0, 7.0))
            .collect::<Vec<_>>();

        assert_eq!(full, 9);
        assert!(windowed.len() < full);
        assert!(windowed.iter().all(|c| c.start >= 2.0 && c.end < 7.0));
    }

    #[test]
    fn restartable() {
        let samples = square(6, 3, 3, 1.0);
        let mut extractor = CycleExtractor::new(&samples, 100);
        let first = extractor.by_ref().collect::<Vec<_>>();
        assert_eq!(extractor.position(), extractor.sample_count());

        extractor.reset();
        let second = extractor.collect::<Vec<_>>();
        assert_eq!(first, second);
    }
}
