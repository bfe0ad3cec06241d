// Synthetic monitor results: average duration series per monitor and the error
// intervals of all monitors grouped where they overlap.

use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use crate::chart::{DataSeriesHelper, MultiErrorIntervalCollector, MultiErrorIntervalMerger};
use crate::models::{DataSeries, GroupedMultiErrorInterval, SyntheticResult};
use crate::monitor_repo::MonitorRepo;
use crate::rollup_levels::RollupLevels;

const NANOS_PER_MILLI: f64 = 1_000_000.0;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyntheticResultsResponse {
    pub data_series_list: Vec<DataSeries>,
    pub data_point_interval_millis: i64,
    pub error_intervals: Vec<GroupedMultiErrorInterval>,
}

pub struct SyntheticService {
    repo: Arc<MonitorRepo>,
    levels: RollupLevels,
}

impl SyntheticService {
    pub fn new(repo: Arc<MonitorRepo>, levels: RollupLevels) -> Self {
        Self { repo, levels }
    }

    #[instrument(skip(self, source_ids), fields(service = "synthetic", operation = "get_results", sources = source_ids.len()))]
    pub async fn get_results(
        &self,
        source_ids: &[String],
        from: i64,
        to: i64,
        now: i64,
    ) -> anyhow::Result<SyntheticResultsResponse> {
        let interval = self.levels.aggregate_interval_millis();
        let helper = DataSeriesHelper::new(now, interval);
        let mut merger = MultiErrorIntervalMerger::new();
        let mut data_series_list = Vec::with_capacity(source_ids.len());
        for source_id in source_ids {
            let results = self
                .repo
                .read_synthetic_results(source_id, from - interval, to)
                .await?;
            data_series_list.push(duration_series(&helper, source_id, &results, from));

            // results of different batches may interleave, the collector needs from order
            let mut error_intervals: Vec<_> = results
                .into_iter()
                .flat_map(|result| result.error_intervals)
                .collect();
            error_intervals.sort_by_key(|e| e.from);
            let mut collector = MultiErrorIntervalCollector::new();
            collector.add_error_intervals(error_intervals);
            merger.add_multi_error_intervals(source_id, collector.merged_error_intervals());
        }
        Ok(SyntheticResultsResponse {
            data_series_list,
            data_point_interval_millis: interval,
            error_intervals: merger.grouped_multi_error_intervals(),
        })
    }
}

/// Average duration in milliseconds per capture time.
pub fn duration_series(
    helper: &DataSeriesHelper,
    source_id: &str,
    results: &[SyntheticResult],
    from: i64,
) -> DataSeries {
    let mut series = DataSeries::new(source_id);
    let mut last_capture_time: Option<i64> = None;
    let mut total_nanos = 0.0;
    let mut total_count = 0;
    for result in results {
        match last_capture_time {
            None => helper.add_initial_upslope_if_needed(from, result.capture_time, &mut series),
            Some(last) => helper.add_gap_if_needed(last, result.capture_time, &mut series),
        }
        series.add(
            result.capture_time,
            average_millis(result.total_duration_nanos, result.execution_count),
        );
        total_nanos += result.total_duration_nanos;
        total_count += result.execution_count;
        last_capture_time = Some(result.capture_time);
    }
    if let Some(last) = last_capture_time {
        helper.add_final_downslope_if_needed(&mut series, last);
        series.set_overall(average_millis(total_nanos, total_count));
    }
    series
}

fn average_millis(total_nanos: f64, count: i64) -> f64 {
    if count == 0 {
        0.0
    } else {
        total_nanos / count as f64 / NANOS_PER_MILLI
    }
}
