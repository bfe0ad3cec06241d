use anyhow::Result;
use apmview::*;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    let levels = rollup_levels::RollupLevels::from_config(&app_config);

    let repo = Arc::new(
        monitor_repo::MonitorRepo::connect(
            &app_config.database.path,
            app_config.database.max_pool_size,
            app_config.database.retention_days,
        )
        .await?,
    );
    repo.init().await?;

    // roll up whatever accumulated while the server was down
    let rollup_delay_millis = app_config.rollup_delay_millis();
    rollup_worker::run_one_tick(
        &repo,
        &levels,
        services::current_time_millis(),
        rollup_delay_millis,
    )
    .await?;
    tracing::info!("startup rollup complete");

    let rollup_handle = rollup_worker::spawn(
        repo.clone(),
        levels.clone(),
        rollup_worker::RollupWorkerConfig {
            aggregation_interval_secs: app_config.rollup.aggregation_interval_secs,
            vacuum_schedule: app_config.rollup.vacuum_schedule.clone(),
            vacuum_interval_secs: app_config.rollup.vacuum_interval_secs,
            rollup_delay_millis,
        },
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let collector_handles = if app_config.collector.enabled {
        let (write_tx, write_rx) = tokio::sync::mpsc::channel(
            collector::writer_channel_capacity(app_config.collector.flush_rate),
        );
        let writer_handle = collector::spawn_gauge_writer(
            write_rx,
            repo.clone(),
            collector::GaugeWriterConfig {
                agent_id: app_config.collector.agent_id.clone(),
                flush_rate: app_config.collector.flush_rate,
                flush_interval_secs: app_config.collector.flush_interval_secs,
            },
            Arc::new(AtomicU64::new(0)),
        );
        let collector_handle = collector::spawn(
            collector::CollectorDeps {
                sampler: Arc::new(collector::HostSampler::new()),
                write_tx,
                shutdown_rx,
            },
            app_config.collector.sample_interval_ms,
        );
        Some((collector_handle, writer_handle))
    } else {
        None
    };

    let app = routes::app(repo, levels);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(s) => s,
                    Err(_) => {
                        let _ = tokio::signal::ctrl_c().await;
                        return;
                    }
                };
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }
        } => {
            tracing::info!("Received shutdown signal");
            let _ = shutdown_tx.send(());
            if let Some((collector_handle, writer_handle)) = collector_handles {
                let _ = collector_handle.await;
                let _ = writer_handle.await;
            }
            rollup_handle.abort();
        }
    }

    Ok(())
}
