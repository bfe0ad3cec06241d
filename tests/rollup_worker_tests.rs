// Rollup worker tests: level-by-level gauge rollup, expiration, charts over stored rollups

mod common;

use apmview::config::RollupLevelConfig;
use apmview::models::{DataPoint, GaugeReading, GaugeValue};
use apmview::rollup_levels::RollupLevels;
use apmview::rollup_worker::run_one_tick;
use apmview::services::GaugeService;
use common::{FIVE_MINUTES, MINUTE, temp_repo, test_levels};

const HOUR: i64 = 3_600_000;
const NO_DELAY: i64 = 0;

/// One raw heap value every 10s from 10s to 130s, value = seconds / 10.
fn raw_heap_readings() -> Vec<GaugeReading> {
    (1..=13)
        .map(|i| GaugeReading {
            gauge_name: "heap".into(),
            capture_time: i * 10_000,
            value: i as f64,
            weight: 1,
        })
        .collect()
}

#[tokio::test]
async fn tick_rolls_up_only_completed_buckets() {
    let (_dir, repo) = temp_repo().await;
    let levels = test_levels();
    repo.save_gauge_readings("agent-1", 0, &raw_heap_readings())
        .await
        .unwrap();

    run_one_tick(&repo, &levels, 150_000, NO_DELAY).await.unwrap();

    let level_1 = repo
        .read_gauge_values("agent-1", "heap", i64::MIN, i64::MAX, 1)
        .await
        .unwrap();
    assert_eq!(
        level_1,
        vec![GaugeValue::new(60_000, 3.5, 6), GaugeValue::new(120_000, 9.5, 6)]
    );
    // no five-minute bucket has completed yet
    let level_2 = repo
        .read_gauge_values("agent-1", "heap", i64::MIN, i64::MAX, 2)
        .await
        .unwrap();
    assert!(level_2.is_empty());
}

#[tokio::test]
async fn later_ticks_continue_from_last_rollup() {
    let (_dir, repo) = temp_repo().await;
    let levels = test_levels();
    repo.save_gauge_readings("agent-1", 0, &raw_heap_readings())
        .await
        .unwrap();

    run_one_tick(&repo, &levels, 150_000, NO_DELAY).await.unwrap();
    // same time again: nothing new to roll up
    run_one_tick(&repo, &levels, 150_000, NO_DELAY).await.unwrap();
    run_one_tick(&repo, &levels, 400_000, NO_DELAY).await.unwrap();

    let level_1 = repo
        .read_gauge_values("agent-1", "heap", i64::MIN, i64::MAX, 1)
        .await
        .unwrap();
    assert_eq!(
        level_1,
        vec![
            GaugeValue::new(60_000, 3.5, 6),
            GaugeValue::new(120_000, 9.5, 6),
            GaugeValue::new(180_000, 13.0, 1),
        ]
    );
    let level_2 = repo
        .read_gauge_values("agent-1", "heap", i64::MIN, i64::MAX, 2)
        .await
        .unwrap();
    assert_eq!(level_2, vec![GaugeValue::new(FIVE_MINUTES, 7.0, 13)]);
}

fn heap(capture_time: i64, value: f64) -> Vec<GaugeReading> {
    vec![GaugeReading {
        gauge_name: "heap".into(),
        capture_time,
        value,
        weight: 1,
    }]
}

#[tokio::test]
async fn delayed_tick_includes_values_that_arrive_late() {
    let (_dir, repo) = temp_repo().await;
    let levels = test_levels();
    let delay = 20_000;
    repo.save_gauge_readings("agent-1", 0, &heap(30_000, 10.0))
        .await
        .unwrap();

    // the first minute ended 1s ago, still inside the delay
    run_one_tick(&repo, &levels, 61_000, delay).await.unwrap();
    let level_1 = repo
        .read_gauge_values("agent-1", "heap", i64::MIN, i64::MAX, 1)
        .await
        .unwrap();
    assert!(level_1.is_empty());

    // buffered by the writer and flushed after the minute ended
    repo.save_gauge_readings("agent-1", 0, &heap(50_000, 30.0))
        .await
        .unwrap();
    run_one_tick(&repo, &levels, 121_000, delay).await.unwrap();

    let level_1 = repo
        .read_gauge_values("agent-1", "heap", i64::MIN, i64::MAX, 1)
        .await
        .unwrap();
    assert_eq!(level_1, vec![GaugeValue::new(MINUTE, 20.0, 2)]);
}

#[tokio::test]
async fn tick_deletes_expired_gauge_values() {
    let (_dir, repo) = temp_repo().await;
    let levels = RollupLevels::new(
        10_000,
        HOUR,
        1,
        vec![RollupLevelConfig {
            interval_millis: MINUTE,
            view_threshold_millis: 4 * HOUR,
            expiration_hours: 0,
        }],
    );
    repo.save_gauge_readings("agent-1", 0, &raw_heap_readings())
        .await
        .unwrap();

    run_one_tick(&repo, &levels, 10 * HOUR, NO_DELAY).await.unwrap();

    let raw = repo
        .read_gauge_values("agent-1", "heap", i64::MIN, i64::MAX, 0)
        .await
        .unwrap();
    assert!(raw.is_empty());
    // rolled up before the raw values expired
    let level_1 = repo
        .read_gauge_values("agent-1", "heap", i64::MIN, i64::MAX, 1)
        .await
        .unwrap();
    assert_eq!(level_1.len(), 3);
}

#[tokio::test]
async fn chart_combines_stored_rollups_with_raw_tail() {
    let (_dir, repo) = temp_repo().await;
    let levels = test_levels();
    repo.save_gauge_readings("agent-1", 0, &raw_heap_readings())
        .await
        .unwrap();
    run_one_tick(&repo, &levels, 150_000, NO_DELAY).await.unwrap();

    let service = GaugeService::new(repo, levels);
    let response = service
        .get_gauge_values("agent-1", &["heap".to_string()], 150_000 - 2 * HOUR, 150_000, 150_000)
        .await
        .unwrap();

    assert_eq!(response.data_point_interval_millis, MINUTE);
    let points: Vec<DataPoint> = response.data_series_list[0].points().copied().collect();
    assert_eq!(
        points,
        vec![
            DataPoint(0, 0.0),
            DataPoint(60_000, 3.5),
            DataPoint(120_000, 9.5),
            DataPoint(130_000, 13.0),
        ]
    );
}
