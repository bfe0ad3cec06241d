// Transaction overview: merged aggregate for the window plus a stacked timer breakdown
// (average self time per transaction for the top timers, remainder under "Other").

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use crate::chart::{DataSeriesHelper, merge_aggregates};
use crate::models::{DataSeries, MergedAggregate, OverviewAggregate, Timer};
use crate::monitor_repo::MonitorRepo;
use crate::rollup_levels::RollupLevels;

const NANOS_PER_MILLI: f64 = 1_000_000.0;
pub const DEFAULT_TIMER_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOverviewResponse {
    pub merged_aggregate: MergedAggregate,
    pub data_series_list: Vec<DataSeries>,
    pub data_point_interval_millis: i64,
}

pub struct TransactionService {
    repo: Arc<MonitorRepo>,
    levels: RollupLevels,
}

impl TransactionService {
    pub fn new(repo: Arc<MonitorRepo>, levels: RollupLevels) -> Self {
        Self { repo, levels }
    }

    #[instrument(skip(self), fields(service = "transaction", operation = "get_overview"))]
    pub async fn get_overview(
        &self,
        agent_id: &str,
        transaction_type: &str,
        from: i64,
        to: i64,
        now: i64,
        limit: usize,
    ) -> anyhow::Result<TransactionOverviewResponse> {
        let interval = self.levels.aggregate_interval_millis();
        let aggregates = self
            .repo
            .read_aggregates(agent_id, transaction_type, from - interval, to)
            .await?;
        let merged_aggregate = merge_aggregates(&aggregates);
        let helper = DataSeriesHelper::new(now, interval);
        let data_series_list = timer_breakdown(&helper, &aggregates, &merged_aggregate, from, limit);
        Ok(TransactionOverviewResponse {
            merged_aggregate,
            data_series_list,
            data_point_interval_millis: interval,
        })
    }
}

/// One series per top timer name plus an "Other" series when more names exist.
pub fn timer_breakdown(
    helper: &DataSeriesHelper,
    aggregates: &[OverviewAggregate],
    merged: &MergedAggregate,
    from: i64,
    limit: usize,
) -> Vec<DataSeries> {
    let mut overall = self_times_by_name(&merged.main_thread_root_timers);
    overall.sort_by(|a, b| b.1.total_cmp(&a.1));
    let top_names: Vec<String> = overall.iter().take(limit).map(|(n, _)| n.clone()).collect();

    let mut series_list: Vec<DataSeries> = top_names.iter().map(DataSeries::new).collect();
    let mut other = (overall.len() > limit).then(DataSeries::other);

    let mut last_capture_time: Option<i64> = None;
    for aggregate in aggregates {
        let capture_time = aggregate.capture_time;
        match last_capture_time {
            None => helper.add_initial_upslope_if_needed_all(
                from,
                capture_time,
                &mut series_list,
                other.as_mut(),
            ),
            Some(last) => {
                helper.add_gap_if_needed_all(last, capture_time, &mut series_list, other.as_mut())
            }
        }
        let self_times: HashMap<String, f64> =
            self_times_by_name(&aggregate.main_thread_root_timers)
                .into_iter()
                .collect();
        let per_transaction = |nanos: f64| per_transaction_millis(nanos, aggregate.transaction_count);
        for (series, name) in series_list.iter_mut().zip(&top_names) {
            let nanos = self_times.get(name).copied().unwrap_or(0.0);
            series.add(capture_time, per_transaction(nanos));
        }
        if let Some(other) = other.as_mut() {
            let rest: f64 = self_times
                .iter()
                .filter(|(name, _)| !top_names.contains(*name))
                .map(|(_, nanos)| nanos)
                .sum();
            other.add(capture_time, per_transaction(rest));
        }
        last_capture_time = Some(capture_time);
    }
    if let Some(last) = last_capture_time {
        helper.add_final_downslope_if_needed_all(&mut series_list, other.as_mut(), last);
    }

    for (series, (_, nanos)) in series_list.iter_mut().zip(&overall) {
        series.set_overall(per_transaction_millis(*nanos, merged.transaction_count));
    }
    if let Some(other) = other.as_mut() {
        let rest: f64 = overall.iter().skip(limit).map(|(_, nanos)| nanos).sum();
        other.set_overall(per_transaction_millis(rest, merged.transaction_count));
    }
    series_list.extend(other);
    series_list
}

/// Self time (total minus children's totals) summed per timer name, first-seen order.
pub fn self_times_by_name(root_timers: &[Timer]) -> Vec<(String, f64)> {
    let mut out: Vec<(String, f64)> = Vec::new();
    for timer in root_timers {
        collect_self_times(timer, &mut out);
    }
    out
}

fn collect_self_times(timer: &Timer, out: &mut Vec<(String, f64)>) {
    let children_nanos: i64 = timer.children.iter().map(|c| c.total_nanos).sum();
    let self_nanos = (timer.total_nanos - children_nanos) as f64;
    match out.iter_mut().find(|(name, _)| *name == timer.name) {
        Some((_, nanos)) => *nanos += self_nanos,
        None => out.push((timer.name.clone(), self_nanos)),
    }
    for child in &timer.children {
        collect_self_times(child, out);
    }
}

fn per_transaction_millis(nanos: f64, transaction_count: i64) -> f64 {
    if transaction_count == 0 {
        0.0
    } else {
        nanos / transaction_count as f64 / NANOS_PER_MILLI
    }
}
