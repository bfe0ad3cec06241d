// Gauge charts: picks a rollup level, reads stored rollups plus a manually rolled-up
// tail from the finer levels, falls back to the largest level when nothing is found, aligns
// trailing partial buckets across gauges and shapes one series per gauge.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::chart::{
    DataSeriesHelper, rollup_ceil, rollup_gauge_values, sync_manual_rollup_capture_times,
};
use crate::models::{DataSeries, GaugeValue, weighted_average};
use crate::monitor_repo::MonitorRepo;
use crate::rollup_levels::RollupLevels;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GaugeValuesResponse {
    pub data_series_list: Vec<DataSeries>,
    pub data_point_interval_millis: i64,
}

pub struct GaugeService {
    repo: Arc<MonitorRepo>,
    levels: RollupLevels,
}

impl GaugeService {
    pub fn new(repo: Arc<MonitorRepo>, levels: RollupLevels) -> Self {
        Self { repo, levels }
    }

    #[instrument(skip(self, gauge_names), fields(service = "gauge", operation = "get_gauge_values", gauges = gauge_names.len()))]
    pub async fn get_gauge_values(
        &self,
        agent_id: &str,
        gauge_names: &[String],
        from: i64,
        to: i64,
        now: i64,
    ) -> anyhow::Result<GaugeValuesResponse> {
        let mut rollup_level = self.levels.gauge_level_for_view(from, to, now);
        let mut gauge_values = self
            .read_gauge_values(agent_id, gauge_names, from, to, rollup_level)
            .await?;
        let largest = self.levels.largest_gauge_level();
        if rollup_level < largest && gauge_values.values().all(Vec::is_empty) {
            // the rollup config may have changed recently, the largest level can still have data
            debug!(rollup_level, largest, "no gauge data, falling back to largest rollup level");
            rollup_level = largest;
            gauge_values = self
                .read_gauge_values(agent_id, gauge_names, from, to, rollup_level)
                .await?;
        }
        let interval = self.levels.gauge_interval_millis(rollup_level);
        if rollup_level > 0 {
            sync_manual_rollup_capture_times(&mut gauge_values, interval);
        }

        let helper = DataSeriesHelper::new(now, interval);
        let data_series_list = gauge_names
            .iter()
            .map(|name| {
                let values = gauge_values.get(name).map(Vec::as_slice).unwrap_or_default();
                build_series(&helper, name, values, from)
            })
            .collect();
        Ok(GaugeValuesResponse {
            data_series_list,
            data_point_interval_millis: interval,
        })
    }

    async fn read_gauge_values(
        &self,
        agent_id: &str,
        gauge_names: &[String],
        from: i64,
        to: i64,
        rollup_level: usize,
    ) -> anyhow::Result<BTreeMap<String, Vec<GaugeValue>>> {
        let mut out = BTreeMap::new();
        for gauge_name in gauge_names {
            let values = self
                .read_gauge(agent_id, gauge_name, from, to, rollup_level)
                .await?;
            out.insert(gauge_name.clone(), values);
        }
        Ok(out)
    }

    async fn read_gauge(
        &self,
        agent_id: &str,
        gauge_name: &str,
        from: i64,
        to: i64,
        rollup_level: usize,
    ) -> anyhow::Result<Vec<GaugeValue>> {
        let interval = self.levels.gauge_interval_millis(rollup_level);
        let revised_from = from - interval;
        let mut values = self
            .repo
            .read_gauge_values(agent_id, gauge_name, revised_from, to, rollup_level)
            .await?;
        if rollup_level == 0 {
            return Ok(values);
        }
        // not rolled up to this level yet: take the finer levels, coarsest first, each one
        // continuing after the last value of the previous, and roll them up on the fly
        let mut cursor = values.last().map_or(revised_from, |v| v.capture_time);
        let mut tail = Vec::new();
        for finer_level in (0..rollup_level).rev() {
            if cursor >= to {
                break;
            }
            let finer = self
                .repo
                .read_gauge_values(agent_id, gauge_name, cursor, to, finer_level)
                .await?;
            if let Some(last) = finer.last() {
                cursor = last.capture_time;
            }
            tail.extend(finer);
        }
        values.extend(rollup_gauge_values(&tail, |t| rollup_ceil(t, interval)));
        Ok(values)
    }
}

fn build_series(
    helper: &DataSeriesHelper,
    gauge_name: &str,
    values: &[GaugeValue],
    from: i64,
) -> DataSeries {
    let mut series = DataSeries::new(gauge_name);
    let Some(first) = values.first() else {
        return series;
    };
    helper.add_initial_upslope_if_needed(from, first.capture_time, &mut series);
    let mut last_capture_time: Option<i64> = None;
    for value in values {
        if let Some(last) = last_capture_time {
            helper.add_gap_if_needed(last, value.capture_time, &mut series);
        }
        series.add(value.capture_time, value.value);
        last_capture_time = Some(value.capture_time);
    }
    if let Some(last) = last_capture_time {
        helper.add_final_downslope_if_needed(&mut series, last);
    }
    if let Some(overall) = weighted_average(values) {
        series.set_overall(overall);
    }
    series
}
