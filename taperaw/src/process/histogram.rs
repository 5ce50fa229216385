use std::collections::BTreeMap;

use crate::structs::cycle::Cycle;
use crate::structs::tape::CLOCKS_PER_GROUP;
use crate::utils::window::TimeWindow;

/// Counts cycles by length in clock-cycle groups.
///
/// Lengths are truncated to whole groups. Only cycles starting inside
/// `window` are counted and only non-empty bins are present.
pub fn histogram(
    cycles: &[Cycle],
    clock_frequency: u32,
    window: TimeWindow,
) -> BTreeMap<u32, u64> {
    let scale = clock_frequency as f64 / CLOCKS_PER_GROUP as f64;
    let mut bins = BTreeMap::new();

    for cycle in cycles.iter().filter(|c| window.contains_after(c.start)) {
        let groups = (cycle.length() * scale).max(0.0) as u32;
        *bins.entry(groups).or_insert(0) += 1;
    }

    bins
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycles(groups: &[u32]) -> Vec<Cycle> {
        let mut start = 0.000_1;
        groups
            .iter()
            .map(|&g| {
                let end = start + (g as f64 + 0.5) * 8.0 / 1_000_000.0;
                let cycle = Cycle::from_span(start, end);
                start = end;
                cycle
            })
            .collect()
    }

    #[test]
    fn bins_by_group() {
        let cycles = cycles(&[52, 52, 104, 52, 300]);
        let bins = histogram(&cycles, 1_000_000, TimeWindow::unbounded());

        assert_eq!(bins.into_iter().collect::<Vec<_>>(), [(52, 3), (104, 1), (300, 1)]);
    }

    #[test]
    fn truncates_partial_groups() {
        let cycles = [Cycle::from_span(0.001, 0.001 + 0.000_420)];
        let bins = histogram(&cycles, 1_000_000, TimeWindow::unbounded());
        assert_eq!(bins.get(&52), Some(&1));
    }

    #[test]
    fn respects_window() {
        let cycles = cycles(&[52, 104, 52, 104]);
        let window = TimeWindow::new(cycles[0].start, cycles[3].start);
        let bins = histogram(&cycles, 1_000_000, window);
        assert_eq!(bins.values().sum::<u64>(), 2);
    }
}
