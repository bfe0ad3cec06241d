// SQLite storage for gauge values (per rollup level), transaction aggregates and
// synthetic monitor results. Timer trees, thread stats and error intervals are BLOBs.

mod blob;

use crate::models::{GaugeReading, GaugeValue, OverviewAggregate, SyntheticResult};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

pub struct MonitorRepo {
    pool: SqlitePool,
    retention_ms: i64,
}

impl MonitorRepo {
    pub async fn connect(path: &str, max_pool_size: u32, retention_days: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        let retention_ms = (retention_days as i64) * 24 * 60 * 60 * 1000;
        Ok(Self { pool, retention_ms })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS gauge_value (
                agent_id TEXT NOT NULL,
                gauge_name TEXT NOT NULL,
                rollup_level INTEGER NOT NULL,
                capture_time INTEGER NOT NULL,
                value REAL NOT NULL,
                weight INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_gauge_value_lookup ON gauge_value(agent_id, gauge_name, rollup_level, capture_time)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS aggregate (
                agent_id TEXT NOT NULL,
                transaction_type TEXT NOT NULL,
                capture_time INTEGER NOT NULL,
                total_duration_nanos REAL NOT NULL,
                transaction_count INTEGER NOT NULL,
                main_thread_root_timers BLOB NOT NULL,
                main_thread_stats BLOB NOT NULL,
                aux_thread_root_timer BLOB,
                aux_thread_stats BLOB,
                async_timers BLOB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_aggregate_lookup ON aggregate(agent_id, transaction_type, capture_time)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS synthetic_result (
                source_id TEXT NOT NULL,
                capture_time INTEGER NOT NULL,
                total_duration_nanos REAL NOT NULL,
                execution_count INTEGER NOT NULL,
                error_intervals BLOB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_synthetic_result_lookup ON synthetic_result(source_id, capture_time)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self, readings), fields(repo = "monitor", operation = "save_gauge_readings", readings_count = readings.len()))]
    pub async fn save_gauge_readings(
        &self,
        agent_id: &str,
        rollup_level: usize,
        readings: &[GaugeReading],
    ) -> anyhow::Result<()> {
        if readings.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for r in readings {
            sqlx::query(
                "INSERT INTO gauge_value (agent_id, gauge_name, rollup_level, capture_time, value, weight) VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(agent_id)
            .bind(&r.gauge_name)
            .bind(rollup_level as i64)
            .bind(r.capture_time)
            .bind(r.value)
            .bind(r.weight)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self, values), fields(repo = "monitor", operation = "save_gauge_values", values_count = values.len()))]
    pub async fn save_gauge_values(
        &self,
        agent_id: &str,
        gauge_name: &str,
        rollup_level: usize,
        values: &[GaugeValue],
    ) -> anyhow::Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for v in values {
            sqlx::query(
                "INSERT INTO gauge_value (agent_id, gauge_name, rollup_level, capture_time, value, weight) VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(agent_id)
            .bind(gauge_name)
            .bind(rollup_level as i64)
            .bind(v.capture_time)
            .bind(v.value)
            .bind(v.weight)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Gauge values with capture time in (from_exclusive, to_inclusive]. Order: ascending.
    #[instrument(skip(self), fields(repo = "monitor", operation = "read_gauge_values"))]
    pub async fn read_gauge_values(
        &self,
        agent_id: &str,
        gauge_name: &str,
        from_exclusive: i64,
        to_inclusive: i64,
        rollup_level: usize,
    ) -> anyhow::Result<Vec<GaugeValue>> {
        let rows = sqlx::query(
            "SELECT capture_time, value, weight FROM gauge_value
             WHERE agent_id = $1 AND gauge_name = $2 AND rollup_level = $3
               AND capture_time > $4 AND capture_time <= $5
             ORDER BY capture_time ASC",
        )
        .bind(agent_id)
        .bind(gauge_name)
        .bind(rollup_level as i64)
        .bind(from_exclusive)
        .bind(to_inclusive)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(GaugeValue::new(
                row.try_get("capture_time")?,
                row.try_get("value")?,
                row.try_get("weight")?,
            ));
        }
        Ok(out)
    }

    /// Latest capture time stored for a gauge at a level (rollup progress marker).
    pub async fn get_last_gauge_capture_time(
        &self,
        agent_id: &str,
        gauge_name: &str,
        rollup_level: usize,
    ) -> anyhow::Result<Option<i64>> {
        let row = sqlx::query_scalar::<_, Option<i64>>(
            "SELECT MAX(capture_time) FROM gauge_value WHERE agent_id = $1 AND gauge_name = $2 AND rollup_level = $3",
        )
        .bind(agent_id)
        .bind(gauge_name)
        .bind(rollup_level as i64)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Distinct (agent_id, gauge_name) pairs with raw values.
    pub async fn get_gauge_keys(&self) -> anyhow::Result<Vec<(String, String)>> {
        let rows = sqlx::query(
            "SELECT DISTINCT agent_id, gauge_name FROM gauge_value WHERE rollup_level = 0 ORDER BY agent_id, gauge_name",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push((row.try_get("agent_id")?, row.try_get("gauge_name")?));
        }
        Ok(out)
    }

    /// Delete gauge values at a level captured before `cutoff_ts`.
    #[instrument(skip(self), fields(repo = "monitor", operation = "delete_gauge_values_before"))]
    pub async fn delete_gauge_values_before(
        &self,
        rollup_level: usize,
        cutoff_ts: i64,
    ) -> anyhow::Result<u64> {
        let r = sqlx::query("DELETE FROM gauge_value WHERE rollup_level = $1 AND capture_time < $2")
            .bind(rollup_level as i64)
            .bind(cutoff_ts)
            .execute(&self.pool)
            .await?;
        Ok(r.rows_affected())
    }

    #[instrument(skip(self, aggregates), fields(repo = "monitor", operation = "save_aggregates", aggregates_count = aggregates.len()))]
    pub async fn save_aggregates(
        &self,
        agent_id: &str,
        transaction_type: &str,
        aggregates: &[OverviewAggregate],
    ) -> anyhow::Result<()> {
        if aggregates.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for a in aggregates {
            let main_thread_root_timers = blob::encode_timers(&a.main_thread_root_timers)?;
            let main_thread_stats = blob::encode_thread_stats(&a.main_thread_stats)?;
            let aux_thread_root_timer = a
                .aux_thread_root_timer
                .as_ref()
                .map(|t| blob::encode_timers(std::slice::from_ref(t)))
                .transpose()?;
            let aux_thread_stats = a
                .aux_thread_stats
                .as_ref()
                .map(blob::encode_thread_stats)
                .transpose()?;
            let async_timers = blob::encode_timers(&a.async_timers)?;
            sqlx::query(
                r#"
                INSERT INTO aggregate
                (agent_id, transaction_type, capture_time, total_duration_nanos, transaction_count,
                 main_thread_root_timers, main_thread_stats, aux_thread_root_timer, aux_thread_stats,
                 async_timers)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(agent_id)
            .bind(transaction_type)
            .bind(a.capture_time)
            .bind(a.total_duration_nanos)
            .bind(a.transaction_count)
            .bind(&main_thread_root_timers)
            .bind(&main_thread_stats)
            .bind(&aux_thread_root_timer)
            .bind(&aux_thread_stats)
            .bind(&async_timers)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Aggregates with capture time in (from_exclusive, to_inclusive]. Order: ascending.
    #[instrument(skip(self), fields(repo = "monitor", operation = "read_aggregates"))]
    pub async fn read_aggregates(
        &self,
        agent_id: &str,
        transaction_type: &str,
        from_exclusive: i64,
        to_inclusive: i64,
    ) -> anyhow::Result<Vec<OverviewAggregate>> {
        let rows = sqlx::query(
            "SELECT capture_time, total_duration_nanos, transaction_count, main_thread_root_timers,
                    main_thread_stats, aux_thread_root_timer, aux_thread_stats, async_timers
             FROM aggregate
             WHERE agent_id = $1 AND transaction_type = $2 AND capture_time > $3 AND capture_time <= $4
             ORDER BY capture_time ASC",
        )
        .bind(agent_id)
        .bind(transaction_type)
        .bind(from_exclusive)
        .bind(to_inclusive)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(Self::parse_aggregate_row(&row)?);
        }
        Ok(out)
    }

    #[instrument(skip(self, results), fields(repo = "monitor", operation = "save_synthetic_results", results_count = results.len()))]
    pub async fn save_synthetic_results(
        &self,
        source_id: &str,
        results: &[SyntheticResult],
    ) -> anyhow::Result<()> {
        if results.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for r in results {
            let error_intervals = blob::encode_error_intervals(&r.error_intervals)?;
            sqlx::query(
                "INSERT INTO synthetic_result (source_id, capture_time, total_duration_nanos, execution_count, error_intervals) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(source_id)
            .bind(r.capture_time)
            .bind(r.total_duration_nanos)
            .bind(r.execution_count)
            .bind(&error_intervals)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Synthetic results with capture time in (from_exclusive, to_inclusive]. Order: ascending.
    #[instrument(skip(self), fields(repo = "monitor", operation = "read_synthetic_results"))]
    pub async fn read_synthetic_results(
        &self,
        source_id: &str,
        from_exclusive: i64,
        to_inclusive: i64,
    ) -> anyhow::Result<Vec<SyntheticResult>> {
        let rows = sqlx::query(
            "SELECT capture_time, total_duration_nanos, execution_count, error_intervals
             FROM synthetic_result
             WHERE source_id = $1 AND capture_time > $2 AND capture_time <= $3
             ORDER BY capture_time ASC",
        )
        .bind(source_id)
        .bind(from_exclusive)
        .bind(to_inclusive)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let error_intervals: Vec<u8> = row.try_get("error_intervals")?;
            out.push(SyntheticResult {
                capture_time: row.try_get("capture_time")?,
                total_duration_nanos: row.try_get("total_duration_nanos")?,
                execution_count: row.try_get("execution_count")?,
                error_intervals: blob::decode_error_intervals(&error_intervals)?,
            });
        }
        Ok(out)
    }

    /// Prune aggregates and synthetic results older than retention_days.
    #[instrument(skip(self), fields(repo = "monitor", operation = "prune_old_data"))]
    pub async fn prune_old_data(&self, now_ms: i64) -> anyhow::Result<u64> {
        let cutoff = now_ms - self.retention_ms;
        let aggregates = sqlx::query("DELETE FROM aggregate WHERE capture_time < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        let results = sqlx::query("DELETE FROM synthetic_result WHERE capture_time < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(aggregates.rows_affected() + results.rows_affected())
    }

    /// Reclaim space after deletes (run periodically after pruning).
    #[instrument(skip(self), fields(repo = "monitor", operation = "vacuum"))]
    pub async fn vacuum(&self) -> anyhow::Result<()> {
        sqlx::query("VACUUM").execute(&self.pool).await?;
        Ok(())
    }

    fn parse_aggregate_row(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<OverviewAggregate> {
        let main_thread_root_timers: Vec<u8> = row.try_get("main_thread_root_timers")?;
        let main_thread_stats: Vec<u8> = row.try_get("main_thread_stats")?;
        let aux_thread_root_timer: Option<Vec<u8>> = row.try_get("aux_thread_root_timer")?;
        let aux_thread_stats: Option<Vec<u8>> = row.try_get("aux_thread_stats")?;
        let async_timers: Vec<u8> = row.try_get("async_timers")?;

        let aux_thread_root_timer = match aux_thread_root_timer {
            Some(bytes) => blob::decode_timers(&bytes)?.into_iter().next(),
            None => None,
        };
        let aux_thread_stats = aux_thread_stats
            .map(|bytes| blob::decode_thread_stats(&bytes))
            .transpose()?;

        Ok(OverviewAggregate {
            capture_time: row.try_get("capture_time")?,
            total_duration_nanos: row.try_get("total_duration_nanos")?,
            transaction_count: row.try_get("transaction_count")?,
            main_thread_root_timers: blob::decode_timers(&main_thread_root_timers)?,
            main_thread_stats: blob::decode_thread_stats(&main_thread_stats)?,
            aux_thread_root_timer,
            aux_thread_stats,
            async_timers: blob::decode_timers(&async_timers)?,
        })
    }
}
