// Built-in collector: samples this host's CPU and memory as raw gauge values.
// Sampling runs in the collector task; persistence runs in a dedicated writer task (channel).

use crate::models::GaugeReading;
use crate::monitor_repo::MonitorRepo;
use crate::services::current_time_millis;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use sysinfo::System;
use tokio::sync::mpsc;
use tokio::time::{Duration, interval};
use tracing::{Instrument, instrument};

pub const CPU_USAGE_GAUGE: &str = "cpu.usage_percent";
pub const MEMORY_USED_GAUGE: &str = "memory.used_bytes";
pub const MEMORY_AVAILABLE_GAUGE: &str = "memory.available_bytes";

/// Channel capacity for the gauge writer (backpressure if the writer falls behind).
pub fn writer_channel_capacity(flush_rate: u64) -> usize {
    (flush_rate as usize * 2).max(32)
}

pub struct HostSampler {
    sys: Arc<std::sync::Mutex<System>>,
}

impl Default for HostSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl HostSampler {
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_all();
        sys.refresh_memory();
        Self {
            sys: Arc::new(std::sync::Mutex::new(sys)),
        }
    }

    /// One reading per host gauge, all stamped with `capture_time`.
    #[instrument(skip(self), fields(collector = "host", operation = "sample"))]
    pub async fn sample(&self, capture_time: i64) -> anyhow::Result<Vec<GaugeReading>> {
        let sys = self.sys.clone();
        tokio::task::spawn_blocking(move || {
            let mut sys = sys
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;
            sys.refresh_cpu_all();
            sys.refresh_memory();

            let total = sys.total_memory();
            let available = sys.available_memory();
            let used = total.saturating_sub(available);
            let reading = |gauge_name: &str, value: f64| GaugeReading {
                gauge_name: gauge_name.to_string(),
                capture_time,
                value,
                weight: 1,
            };
            Ok(vec![
                reading(CPU_USAGE_GAUGE, sys.global_cpu_usage() as f64),
                reading(MEMORY_USED_GAUGE, used as f64),
                reading(MEMORY_AVAILABLE_GAUGE, available as f64),
            ])
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }
}

/// Sampler, channel and shutdown for the collector.
pub struct CollectorDeps {
    pub sampler: Arc<HostSampler>,
    pub write_tx: mpsc::Sender<GaugeReading>,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

/// Writer config: batching for the dedicated gauge writer task.
pub struct GaugeWriterConfig {
    pub agent_id: String,
    pub flush_rate: u64,
    pub flush_interval_secs: u64,
}

/// Spawns the task that receives readings from the collector and flushes them as raw
/// gauge values. Flushes when buffer len >= flush_rate, every flush_interval_secs, or
/// when the channel closes.
pub fn spawn_gauge_writer(
    mut write_rx: mpsc::Receiver<GaugeReading>,
    repo: Arc<MonitorRepo>,
    config: GaugeWriterConfig,
    readings_saved_total: Arc<AtomicU64>,
) -> tokio::task::JoinHandle<()> {
    let flush_interval = Duration::from_secs(config.flush_interval_secs);
    tokio::spawn(async move {
        let mut buffer: Vec<GaugeReading> = Vec::new();
        let mut flush_tick = interval(flush_interval);
        flush_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                result = write_rx.recv() => {
                    match result {
                        Some(reading) => {
                            buffer.push(reading);
                            if buffer.len() >= config.flush_rate as usize
                                && let Err(e) = flush_buffer(&repo, &config.agent_id, &mut buffer, &readings_saved_total).await
                            {
                                tracing::warn!(error = %e, "gauge writer: save failed");
                            }
                        }
                        None => break,
                    }
                }
                _ = flush_tick.tick() => {
                    if let Err(e) = flush_buffer(&repo, &config.agent_id, &mut buffer, &readings_saved_total).await {
                        tracing::warn!(error = %e, "gauge writer: save failed");
                    }
                }
            }
        }
        if let Err(e) =
            flush_buffer(&repo, &config.agent_id, &mut buffer, &readings_saved_total).await
        {
            tracing::warn!(error = %e, "gauge writer: final flush failed");
        }
        tracing::debug!("Gauge writer shutting down");
    })
}

async fn flush_buffer(
    repo: &MonitorRepo,
    agent_id: &str,
    buffer: &mut Vec<GaugeReading>,
    readings_saved_total: &AtomicU64,
) -> anyhow::Result<()> {
    if buffer.is_empty() {
        return Ok(());
    }
    let n = buffer.len();
    repo.save_gauge_readings(agent_id, 0, buffer).await?;
    readings_saved_total.fetch_add(n as u64, std::sync::atomic::Ordering::Relaxed);
    buffer.clear();
    tracing::debug!(
        operation = "save_gauge_readings",
        readings_count = n,
        "Gauge readings saved"
    );
    Ok(())
}

/// Spawns the sampling loop. Dropping out of the loop (shutdown) drops `write_tx`,
/// which lets the writer flush and exit.
pub fn spawn(deps: CollectorDeps, sample_interval_ms: u64) -> tokio::task::JoinHandle<()> {
    let CollectorDeps {
        sampler,
        write_tx,
        mut shutdown_rx,
    } = deps;

    let collector_span = tracing::span!(tracing::Level::DEBUG, "collector", sample_interval_ms);
    let task = async move {
        let mut tick = interval(Duration::from_millis(sample_interval_ms));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let readings = match sampler.sample(current_time_millis()).await {
                        Ok(r) => r,
                        Err(e) => {
                            tracing::warn!(error = %e, operation = "sample", "host sample failed");
                            continue;
                        }
                    };
                    for reading in readings {
                        if write_tx.send(reading).await.is_err() {
                            tracing::warn!("gauge writer closed; stopping collector");
                            return;
                        }
                    }
                }
                _ = &mut shutdown_rx => {
                    tracing::info!("Collector shutting down");
                    break;
                }
            }
        }
    };
    tokio::spawn(task.instrument(collector_span))
}
