//! Quantization of cycle lengths to the target clock.

use crate::structs::cycle::Cycle;
use crate::structs::tape::CLOCKS_PER_GROUP;
use crate::utils::window::TimeWindow;

/// Rounds `length` seconds to the nearest whole number of clock-cycle groups.
#[inline(always)]
pub fn quantize(length: f64, clock_frequency: u32) -> f64 {
    let group = CLOCKS_PER_GROUP as f64 / clock_frequency as f64;
    (length / group).round() * group
}

/// Recomputes `end` of every cycle starting inside `window` so that its length
/// is a whole number of clock-cycle groups. Starts are left untouched.
///
/// Returns the number of cycles visited.
pub fn analyse(cycles: &mut [Cycle], clock_frequency: u32, window: TimeWindow) -> usize {
    let group = CLOCKS_PER_GROUP as f64 / clock_frequency as f64;
    let mut touched = 0;

    for cycle in cycles
        .iter_mut()
        .filter(|cycle| window.contains_after(cycle.start))
    {
        let groups = (cycle.length() / group).round();
        cycle.end = cycle.start + groups * group;
        cycle.mid = cycle.mid.clamp(cycle.start, cycle.end);
        touched += 1;
    }

    touched
}
