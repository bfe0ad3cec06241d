// Background worker: roll gauge values up level by level (raw -> 1-min -> 5-min ...),
// then prune expired levels and old aggregates / synthetic results.
// VACUUM runs on a configurable schedule (cron expression or fixed interval).

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::chart::{rollup_ceil, rollup_floor, rollup_gauge_values};
use crate::monitor_repo::MonitorRepo;
use crate::rollup_levels::RollupLevels;
use crate::services::current_time_millis;
use tracing::{info, instrument, warn};

/// Config for the rollup worker.
#[derive(Debug, Clone)]
pub struct RollupWorkerConfig {
    pub aggregation_interval_secs: u64,
    /// Optional cron expression for VACUUM (e.g. "0 3 * * *" = 03:00 daily). Uses local time.
    pub vacuum_schedule: Option<String>,
    /// Run VACUUM every N seconds when vacuum_schedule is not set.
    pub vacuum_interval_secs: u64,
    /// Buckets ending after `now - rollup_delay_millis` are left for a later tick.
    pub rollup_delay_millis: i64,
}

/// Spawns the rollup worker. Returns a join handle.
pub fn spawn(
    repo: Arc<MonitorRepo>,
    levels: RollupLevels,
    config: RollupWorkerConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run(repo, levels, config).await;
    })
}

#[instrument(skip(repo, levels), fields(interval_secs = config.aggregation_interval_secs))]
async fn run(repo: Arc<MonitorRepo>, levels: RollupLevels, config: RollupWorkerConfig) {
    let mut rollup_interval =
        tokio::time::interval(Duration::from_secs(config.aggregation_interval_secs));
    rollup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let (vacuum_tx, mut vacuum_rx) = tokio::sync::mpsc::channel::<()>(1);
    tokio::spawn(vacuum_scheduler(config.clone(), vacuum_tx));

    loop {
        tokio::select! {
            _ = rollup_interval.tick() => {
                if let Err(e) = run_one_tick(
                    &repo,
                    &levels,
                    current_time_millis(),
                    config.rollup_delay_millis,
                )
                .await {
                    warn!(error = %e, "rollup tick failed");
                }
            }
            _ = vacuum_rx.recv() => {
                if let Err(e) = repo.vacuum().await {
                    warn!(error = %e, "vacuum failed");
                } else {
                    info!("vacuum complete");
                }
            }
        }
    }
}

/// Sends a message on `tx` at each VACUUM time (cron or fixed interval). Uses local time for cron.
async fn vacuum_scheduler(config: RollupWorkerConfig, tx: tokio::sync::mpsc::Sender<()>) {
    if let Some(ref cron_str) = config.vacuum_schedule {
        let Ok(schedule) = cron::Schedule::from_str(cron_str) else {
            warn!(cron = %cron_str, "invalid vacuum_schedule; VACUUM will not run");
            return;
        };
        loop {
            let now = chrono::Local::now();
            let next = schedule.after(&now).next();
            if let Some(next) = next {
                let delay = (next - now).to_std().unwrap_or(Duration::from_secs(1));
                tokio::time::sleep(delay).await;
                if tx.send(()).await.is_err() {
                    break;
                }
            } else {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
        }
    } else {
        let interval = Duration::from_secs(config.vacuum_interval_secs);
        loop {
            tokio::time::sleep(interval).await;
            if tx.send(()).await.is_err() {
                break;
            }
        }
    }
}

/// Runs one rollup pass for every gauge and level, then prunes. Also run once at startup.
/// A bucket is rolled up once it ended at least `rollup_delay_millis` ago; its source values
/// are never read again, so anything arriving later for it is not reflected in the rollup.
pub async fn run_one_tick(
    repo: &MonitorRepo,
    levels: &RollupLevels,
    now_ms: i64,
    rollup_delay_millis: i64,
) -> anyhow::Result<()> {
    let gauge_keys = repo.get_gauge_keys().await?;

    for level in 1..=levels.largest_gauge_level() {
        let interval = levels.gauge_interval_millis(level);
        // only buckets that ended before the ingest delay
        let complete_to = rollup_floor(now_ms - rollup_delay_millis, interval);
        let mut rolled_up_count: usize = 0;

        for (agent_id, gauge_name) in &gauge_keys {
            let last_rolled_up = repo
                .get_last_gauge_capture_time(agent_id, gauge_name, level)
                .await?
                .unwrap_or(i64::MIN);
            if last_rolled_up >= complete_to {
                continue;
            }
            let source = repo
                .read_gauge_values(agent_id, gauge_name, last_rolled_up, complete_to, level - 1)
                .await?;
            let mut rolled_up = rollup_gauge_values(&source, |t| rollup_ceil(t, interval));
            // every stored bucket is complete, so the last one is keyed by rollup time too
            if let Some(last) = rolled_up.last_mut() {
                last.capture_time = rollup_ceil(last.capture_time, interval);
            }
            repo.save_gauge_values(agent_id, gauge_name, level, &rolled_up)
                .await?;
            rolled_up_count += rolled_up.len();
        }

        if rolled_up_count > 0 {
            info!(
                rollup_level = level,
                rolled_up_values = rolled_up_count,
                "gauge rollup"
            );
        }
    }

    for level in 0..=levels.largest_gauge_level() {
        if let Some(expiration) = levels.gauge_expiration_millis(level) {
            repo.delete_gauge_values_before(level, now_ms - expiration)
                .await?;
        }
    }
    repo.prune_old_data(now_ms).await?;

    Ok(())
}
