// Service tests: gauge charts, transaction overview breakdown, synthetic results

mod common;

use apmview::chart::DataSeriesHelper;
use apmview::chart::merge_aggregates;
use apmview::models::{DataPoint, ErrorInterval, GaugeReading, GaugeValue, OverviewAggregate, SyntheticResult, Timer};
use apmview::services::transaction::{self_times_by_name, timer_breakdown};
use apmview::services::{GaugeService, SyntheticService, TransactionService};
use common::{FIVE_MINUTES, MINUTE, temp_repo, test_levels};

const HOUR: i64 = 3_600_000;
// aligned to every test rollup interval
const NOW: i64 = 10 * HOUR;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn raw(gauge_name: &str, capture_time: i64, value: f64) -> GaugeReading {
    GaugeReading {
        gauge_name: gauge_name.into(),
        capture_time,
        value,
        weight: 1,
    }
}

fn point(capture_time: i64, value: f64) -> Option<DataPoint> {
    Some(DataPoint(capture_time, value))
}

#[tokio::test]
async fn gauge_short_view_reads_raw_values() {
    let (_dir, repo) = temp_repo().await;
    let from = NOW - 10 * MINUTE;
    repo.save_gauge_readings(
        "agent-1",
        0,
        &[raw("heap", from + 10_000, 1.0), raw("heap", from + 20_000, 2.0), raw("heap", from + 30_000, 6.0)],
    )
    .await
    .unwrap();

    let service = GaugeService::new(repo, test_levels());
    let response = service
        .get_gauge_values("agent-1", &["heap".to_string()], from, NOW, NOW)
        .await
        .unwrap();

    assert_eq!(response.data_point_interval_millis, 10_000);
    let series = &response.data_series_list[0];
    assert_eq!(series.name.as_deref(), Some("heap"));
    assert_eq!(
        series.data,
        vec![
            point(from, 0.0),
            point(from + 10_000, 1.0),
            point(from + 20_000, 2.0),
            point(from + 30_000, 6.0),
            // stale: nothing since, so the series drops to zero
            point(from + 40_000, 0.0),
        ]
    );
    assert_eq!(series.overall, Some(3.0));
}

#[tokio::test]
async fn gauge_rollup_view_rolls_up_raw_tail_and_syncs_gauges() {
    let (_dir, repo) = temp_repo().await;
    repo.save_gauge_readings(
        "agent-1",
        0,
        &[
            raw("heap", NOW - 100_000, 2.0),
            raw("heap", NOW - 70_000, 4.0),
            raw("heap", NOW - 30_000, 6.0),
            raw("cpu", NOW - 90_000, 10.0),
            raw("cpu", NOW - 20_000, 20.0),
        ],
    )
    .await
    .unwrap();

    let service = GaugeService::new(repo, test_levels());
    let names = vec!["heap".to_string(), "cpu".to_string()];
    let response = service
        .get_gauge_values("agent-1", &names, NOW - 2 * HOUR, NOW, NOW)
        .await
        .unwrap();

    assert_eq!(response.data_point_interval_millis, MINUTE);
    let heap = &response.data_series_list[0];
    assert_eq!(
        heap.data,
        vec![
            point(NOW - 2 * MINUTE, 0.0),
            point(NOW - MINUTE, 3.0),
            // partial bucket moved onto the latest partial bucket among the gauges
            point(NOW - 20_000, 6.0),
        ]
    );
    assert!(approx_eq(heap.overall.unwrap(), 4.0));

    let cpu = &response.data_series_list[1];
    assert_eq!(cpu.name.as_deref(), Some("cpu"));
    assert_eq!(cpu.points().last(), Some(&DataPoint(NOW - 20_000, 20.0)));
}

#[tokio::test]
async fn gauge_falls_back_to_largest_level_when_chosen_level_is_empty() {
    let (_dir, repo) = temp_repo().await;
    repo.save_gauge_values(
        "agent-1",
        "heap",
        2,
        &[GaugeValue::new(NOW - 2 * FIVE_MINUTES, 5.0, 30), GaugeValue::new(NOW - FIVE_MINUTES, 7.0, 30)],
    )
    .await
    .unwrap();

    let service = GaugeService::new(repo, test_levels());
    let response = service
        .get_gauge_values("agent-1", &["heap".to_string()], NOW - 30 * MINUTE, NOW, NOW)
        .await
        .unwrap();

    assert_eq!(response.data_point_interval_millis, FIVE_MINUTES);
    let series = &response.data_series_list[0];
    assert_eq!(
        series.data,
        vec![
            point(NOW - 3 * FIVE_MINUTES, 0.0),
            point(NOW - 2 * FIVE_MINUTES, 5.0),
            point(NOW - FIVE_MINUTES, 7.0),
        ]
    );
    assert_eq!(series.overall, Some(6.0));
}

#[tokio::test]
async fn gauge_tail_rolls_up_finer_rollups_when_raw_values_are_gone() {
    let (_dir, repo) = temp_repo().await;
    repo.save_gauge_values(
        "agent-1",
        "heap",
        2,
        &[GaugeValue::new(NOW - 2 * FIVE_MINUTES, 5.0, 30), GaugeValue::new(NOW - FIVE_MINUTES, 7.0, 30)],
    )
    .await
    .unwrap();
    // one-minute rollups past the last five-minute one, raw values already expired
    repo.save_gauge_values(
        "agent-1",
        "heap",
        1,
        &[GaugeValue::new(NOW - 4 * MINUTE, 10.0, 6), GaugeValue::new(NOW - 3 * MINUTE, 20.0, 6)],
    )
    .await
    .unwrap();

    let service = GaugeService::new(repo, test_levels());
    let response = service
        .get_gauge_values("agent-1", &["heap".to_string()], NOW - 30 * MINUTE, NOW, NOW)
        .await
        .unwrap();

    assert_eq!(response.data_point_interval_millis, FIVE_MINUTES);
    let series = &response.data_series_list[0];
    assert_eq!(
        series.data,
        vec![
            point(NOW - 3 * FIVE_MINUTES, 0.0),
            point(NOW - 2 * FIVE_MINUTES, 5.0),
            point(NOW - FIVE_MINUTES, 7.0),
            point(NOW - 3 * MINUTE, 15.0),
        ]
    );
    assert_eq!(series.overall, Some(7.5));
}

#[tokio::test]
async fn gauge_without_data_yields_empty_series() {
    let (_dir, repo) = temp_repo().await;
    let service = GaugeService::new(repo, test_levels());
    let response = service
        .get_gauge_values("agent-1", &["heap".to_string()], NOW - HOUR, NOW, NOW)
        .await
        .unwrap();
    assert_eq!(response.data_series_list.len(), 1);
    assert!(response.data_series_list[0].is_empty());
    assert_eq!(response.data_series_list[0].overall, None);
}

fn breakdown_aggregates() -> Vec<OverviewAggregate> {
    let mut first = OverviewAggregate::new(60_000, 2);
    first.main_thread_root_timers = vec![
        Timer::with_totals("http request", 2, 4_000_000).with_child(Timer::with_totals("jdbc query", 2, 1_000_000)),
        Timer::with_totals("servlet", 1, 2_000_000),
    ];
    let mut second = OverviewAggregate::new(120_000, 1);
    second.main_thread_root_timers = vec![
        Timer::with_totals("http request", 1, 3_000_000).with_child(Timer::with_totals("jdbc query", 1, 2_000_000)),
        Timer::with_totals("cache get", 1, 500_000),
    ];
    vec![first, second]
}

#[test]
fn self_times_subtract_child_totals() {
    let self_times = self_times_by_name(&breakdown_aggregates()[0].main_thread_root_timers);
    assert_eq!(
        self_times,
        vec![
            ("http request".to_string(), 3_000_000.0),
            ("jdbc query".to_string(), 1_000_000.0),
            ("servlet".to_string(), 2_000_000.0),
        ]
    );
}

#[test]
fn timer_breakdown_keeps_top_timers_and_folds_the_rest_into_other() {
    let aggregates = breakdown_aggregates();
    let merged = merge_aggregates(&aggregates);
    let helper = DataSeriesHelper::new(120_000, MINUTE);

    let series_list = timer_breakdown(&helper, &aggregates, &merged, 60_000, 2);

    let names: Vec<Option<&str>> = series_list.iter().map(|s| s.name.as_deref()).collect();
    assert_eq!(names, vec![Some("http request"), Some("jdbc query"), None]);
    assert_eq!(series_list[0].data, vec![point(60_000, 1.5), point(120_000, 1.0)]);
    assert_eq!(series_list[1].data, vec![point(60_000, 0.5), point(120_000, 2.0)]);
    assert_eq!(series_list[2].data, vec![point(60_000, 1.0), point(120_000, 0.5)]);
    assert!(approx_eq(series_list[0].overall.unwrap(), 4.0 / 3.0));
    assert!(approx_eq(series_list[1].overall.unwrap(), 1.0));
    assert!(approx_eq(series_list[2].overall.unwrap(), 2.5 / 3.0));
}

#[test]
fn timer_breakdown_shapes_all_series_together() {
    let aggregates = breakdown_aggregates();
    let merged = merge_aggregates(&aggregates);
    // request starts before the data, and the data has gone stale
    let helper = DataSeriesHelper::new(600_000, MINUTE);

    let series_list = timer_breakdown(&helper, &aggregates, &merged, 0, 1);

    assert_eq!(series_list.len(), 2);
    for series in &series_list {
        assert_eq!(series.data.len(), 4);
        assert_eq!(series.data[0], point(0, 0.0));
        assert_eq!(series.data[3], point(180_000, 0.0));
    }
}

#[test]
fn timer_breakdown_without_other_when_limit_covers_all_timers() {
    let aggregates = breakdown_aggregates();
    let merged = merge_aggregates(&aggregates);
    let helper = DataSeriesHelper::new(120_000, MINUTE);
    let series_list = timer_breakdown(&helper, &aggregates, &merged, 60_000, 10);
    assert_eq!(series_list.len(), 4);
    assert!(series_list.iter().all(|s| s.name.is_some()));
}

#[tokio::test]
async fn transaction_overview_merges_stored_aggregates() {
    let (_dir, repo) = temp_repo().await;
    repo.save_aggregates("agent-1", "Web", &breakdown_aggregates())
        .await
        .unwrap();

    let service = TransactionService::new(repo, test_levels());
    let response = service
        .get_overview("agent-1", "Web", 60_000, 120_000, 120_000, 2)
        .await
        .unwrap();

    assert_eq!(response.data_point_interval_millis, MINUTE);
    assert_eq!(response.merged_aggregate.transaction_count, 3);
    assert_eq!(response.merged_aggregate.main_thread_root_timers.len(), 3);
    assert_eq!(response.data_series_list.len(), 3);
}

#[tokio::test]
async fn transaction_overview_without_data() {
    let (_dir, repo) = temp_repo().await;
    let service = TransactionService::new(repo, test_levels());
    let response = service
        .get_overview("agent-1", "Web", 0, HOUR, HOUR, 5)
        .await
        .unwrap();
    assert_eq!(response.merged_aggregate.transaction_count, 0);
    assert!(response.data_series_list.is_empty());
}

#[tokio::test]
async fn synthetic_results_group_error_intervals_across_monitors() {
    let (_dir, repo) = temp_repo().await;
    repo.save_synthetic_results(
        "login",
        &[
            SyntheticResult {
                capture_time: 60_000,
                total_duration_nanos: 4_000_000.0,
                execution_count: 2,
                error_intervals: vec![],
            },
            SyntheticResult {
                capture_time: 120_000,
                total_duration_nanos: 1_000_000.0,
                execution_count: 1,
                error_intervals: vec![
                    ErrorInterval::new(61_000, 70_000, 1, "HTTP 500"),
                    ErrorInterval::new(70_000, 80_000, 1, "HTTP 500"),
                ],
            },
        ],
    )
    .await
    .unwrap();
    repo.save_synthetic_results(
        "search",
        &[SyntheticResult {
            capture_time: 120_000,
            total_duration_nanos: 3_000_000.0,
            execution_count: 1,
            error_intervals: vec![ErrorInterval::new(75_000, 90_000, 2, "timeout")],
        }],
    )
    .await
    .unwrap();

    let service = SyntheticService::new(repo, test_levels());
    let sources = vec!["login".to_string(), "search".to_string()];
    let response = service
        .get_results(&sources, 60_000, 120_000, 120_000)
        .await
        .unwrap();

    assert_eq!(response.data_point_interval_millis, MINUTE);
    let login = &response.data_series_list[0];
    assert_eq!(login.data, vec![point(60_000, 2.0), point(120_000, 1.0)]);
    assert!(approx_eq(login.overall.unwrap(), 5.0 / 3.0));
    let search = &response.data_series_list[1];
    assert_eq!(search.data, vec![point(60_000, 0.0), point(120_000, 3.0)]);

    assert_eq!(response.error_intervals.len(), 1);
    let group = &response.error_intervals[0];
    assert_eq!((group.from, group.to), (61_000, 90_000));
    assert_eq!(group.error_intervals_by_source["login"].len(), 2);
    assert_eq!(group.error_intervals_by_source["search"].len(), 1);
}

#[tokio::test]
async fn synthetic_error_intervals_interleaved_across_results_are_ordered_before_collecting() {
    let (_dir, repo) = temp_repo().await;
    repo.save_synthetic_results(
        "login",
        &[
            SyntheticResult {
                capture_time: 60_000,
                total_duration_nanos: 1_000_000.0,
                execution_count: 1,
                error_intervals: vec![ErrorInterval::new(50_000, 55_000, 1, "late")],
            },
            SyntheticResult {
                capture_time: 120_000,
                total_duration_nanos: 1_000_000.0,
                execution_count: 1,
                error_intervals: vec![ErrorInterval::new(40_000, 45_000, 1, "early")],
            },
        ],
    )
    .await
    .unwrap();

    let service = SyntheticService::new(repo, test_levels());
    let response = service
        .get_results(&["login".to_string()], 60_000, 120_000, 120_000)
        .await
        .unwrap();

    assert_eq!(response.error_intervals.len(), 1);
    let group = &response.error_intervals[0];
    assert_eq!((group.from, group.to), (40_000, 55_000));
    let messages: Vec<&str> = group.error_intervals_by_source["login"]
        .iter()
        .map(|e| e.message.as_str())
        .collect();
    assert_eq!(messages, vec!["early", "late"]);
}
