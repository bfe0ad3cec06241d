// Shapes sparse samples into renderable series: zero upslope before the first point,
// zero notches across missing intervals, zero downslope after stale trailing data.

use crate::models::DataSeries;

use super::capture_time::rollup_floor;

/// Synthetic points for a gap between two samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gap {
    /// Exactly one sample missing: a single zero point.
    Single(i64),
    /// Zero down, null marker, zero up.
    Notch { down: i64, up: i64 },
}

/// One helper per request: interval and live capture time are fixed for its lifetime.
#[derive(Debug, Clone, Copy)]
pub struct DataSeriesHelper {
    live_capture_time: i64,
    data_point_interval_millis: i64,
}

impl DataSeriesHelper {
    pub fn new(live_capture_time: i64, data_point_interval_millis: i64) -> Self {
        Self {
            live_capture_time,
            data_point_interval_millis,
        }
    }

    pub fn data_point_interval_millis(&self) -> i64 {
        self.data_point_interval_millis
    }

    pub fn live_capture_time(&self) -> i64 {
        self.live_capture_time
    }

    pub fn add_initial_upslope_if_needed(
        &self,
        request_from: i64,
        first_capture_time: i64,
        series: &mut DataSeries,
    ) {
        if let Some(prior) = self.initial_upslope(request_from, first_capture_time) {
            series.add(prior, 0.0);
        }
    }

    /// Same zero point at the same timestamp on every series (and "Other", if any).
    pub fn add_initial_upslope_if_needed_all(
        &self,
        request_from: i64,
        first_capture_time: i64,
        series_list: &mut [DataSeries],
        other: Option<&mut DataSeries>,
    ) {
        if let Some(prior) = self.initial_upslope(request_from, first_capture_time) {
            for series in series_list.iter_mut().chain(other) {
                series.add(prior, 0.0);
            }
        }
    }

    pub fn add_gap_if_needed(
        &self,
        last_capture_time: i64,
        capture_time: i64,
        series: &mut DataSeries,
    ) {
        if let Some(gap) = self.gap(last_capture_time, capture_time) {
            apply_gap(gap, series);
        }
    }

    pub fn add_gap_if_needed_all(
        &self,
        last_capture_time: i64,
        capture_time: i64,
        series_list: &mut [DataSeries],
        other: Option<&mut DataSeries>,
    ) {
        if let Some(gap) = self.gap(last_capture_time, capture_time) {
            for series in series_list.iter_mut().chain(other) {
                apply_gap(gap, series);
            }
        }
    }

    pub fn add_final_downslope_if_needed(&self, series: &mut DataSeries, last_capture_time: i64) {
        if let Some(next) = self.final_downslope(last_capture_time) {
            series.add(next, 0.0);
        }
    }

    pub fn add_final_downslope_if_needed_all(
        &self,
        series_list: &mut [DataSeries],
        other: Option<&mut DataSeries>,
        last_capture_time: i64,
    ) {
        if let Some(next) = self.final_downslope(last_capture_time) {
            for series in series_list.iter_mut().chain(other) {
                series.add(next, 0.0);
            }
        }
    }

    fn initial_upslope(&self, request_from: i64, first_capture_time: i64) -> Option<i64> {
        if first_capture_time == request_from {
            return None;
        }
        let interval = self.data_point_interval_millis;
        Some(rollup_floor(first_capture_time, interval) - interval)
    }

    fn gap(&self, last_capture_time: i64, capture_time: i64) -> Option<Gap> {
        let interval = self.data_point_interval_millis;
        if capture_time - last_capture_time <= interval {
            return None;
        }
        let current_capture_time = rollup_floor(capture_time, interval);
        if current_capture_time - last_capture_time == 2 * interval {
            Some(Gap::Single(last_capture_time + interval))
        } else {
            Some(Gap::Notch {
                down: last_capture_time + interval,
                up: current_capture_time - interval,
            })
        }
    }

    fn final_downslope(&self, last_capture_time: i64) -> Option<i64> {
        // live - last > 1.5 * interval, kept in integer arithmetic
        let stale = 2 * (self.live_capture_time - last_capture_time);
        (stale > 3 * self.data_point_interval_millis)
            .then_some(last_capture_time + self.data_point_interval_millis)
    }
}

fn apply_gap(gap: Gap, series: &mut DataSeries) {
    match gap {
        Gap::Single(at) => series.add(at, 0.0),
        Gap::Notch { down, up } => {
            series.add(down, 0.0);
            series.add_null();
            series.add(up, 0.0);
        }
    }
}
