// Rounding of capture times onto rollup interval boundaries

/// Largest multiple of `interval_millis` that is <= `capture_time`.
pub fn rollup_floor(capture_time: i64, interval_millis: i64) -> i64 {
    capture_time.div_euclid(interval_millis) * interval_millis
}

/// Smallest multiple of `interval_millis` that is >= `capture_time`.
/// A rollup bucket is labelled by its end, so `(t - interval, t]` maps to `t`.
pub fn rollup_ceil(capture_time: i64, interval_millis: i64) -> i64 {
    let floor = rollup_floor(capture_time, interval_millis);
    if floor == capture_time {
        capture_time
    } else {
        floor + interval_millis
    }
}

pub fn is_aligned(capture_time: i64, interval_millis: i64) -> bool {
    capture_time.rem_euclid(interval_millis) == 0
}
