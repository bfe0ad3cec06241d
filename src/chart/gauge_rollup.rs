// Weighted-average rollup of gauge values, and alignment of trailing partial buckets
// across several gauges.

use std::collections::BTreeMap;

use crate::models::GaugeValue;

use super::capture_time::{is_aligned, rollup_floor};

/// Upper bound on how far a trailing partial bucket is moved to line up with the others.
const MAX_SYNC_DISTANCE_MILLIS: i64 = 60_000;

/// Rolls `ordered` (ascending by capture time) up into buckets keyed by
/// `rollup_capture_time(capture_time)`.
///
/// Each bucket's value is the weighted average of its members and its weight the sum of
/// their weights. Interior buckets carry their rollup capture time; the last bucket
/// carries the capture time of the last input value instead, so an incomplete tail
/// keeps its real end time.
pub fn rollup_gauge_values<F>(ordered: &[GaugeValue], rollup_capture_time: F) -> Vec<GaugeValue>
where
    F: Fn(i64) -> i64,
{
    debug_assert!(
        ordered
            .windows(2)
            .all(|w| w[0].capture_time <= w[1].capture_time),
        "gauge values must be ordered by capture time"
    );

    let mut rolled_up = Vec::new();
    let mut curr_total = 0.0;
    let mut curr_weight: i64 = 0;
    let mut curr_rollup_capture_time = i64::MIN;
    for gauge_value in ordered {
        let rollup_key = rollup_capture_time(gauge_value.capture_time);
        if rollup_key != curr_rollup_capture_time && curr_weight > 0 {
            rolled_up.push(GaugeValue::new(
                curr_rollup_capture_time,
                curr_total / curr_weight as f64,
                curr_weight,
            ));
            curr_total = 0.0;
            curr_weight = 0;
        }
        curr_rollup_capture_time = rollup_key;
        curr_total += gauge_value.value * gauge_value.weight as f64;
        curr_weight += gauge_value.weight;
    }
    if curr_weight > 0
        && let Some(last) = ordered.last()
    {
        rolled_up.push(GaugeValue::new(
            last.capture_time,
            curr_total / curr_weight as f64,
            curr_weight,
        ));
    }
    rolled_up
}

/// Moves unaligned trailing values that fall in the same rollup interval as the latest
/// trailing value, and lie within `min(interval / 5, 60s)` of it, onto its capture time.
pub fn sync_manual_rollup_capture_times<K: Ord>(
    gauge_values: &mut BTreeMap<K, Vec<GaugeValue>>,
    fixed_interval_millis: i64,
) {
    let Some(max_capture_time) = gauge_values
        .values()
        .filter_map(|values| values.last())
        .map(|last| last.capture_time)
        .max()
    else {
        return;
    };
    let max_rollup_capture_time = rollup_floor(max_capture_time, fixed_interval_millis);
    let tolerance = (fixed_interval_millis / 5).min(MAX_SYNC_DISTANCE_MILLIS);

    for last in gauge_values.values_mut().filter_map(|values| values.last_mut()) {
        let capture_time = last.capture_time;
        if is_aligned(capture_time, fixed_interval_millis) {
            continue;
        }
        if rollup_floor(capture_time, fixed_interval_millis) == max_rollup_capture_time
            && max_capture_time - capture_time <= tolerance
        {
            last.capture_time = max_capture_time;
        }
    }
}
