use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub collector: CollectorConfig,
    pub rollup: RollupConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
    /// Aggregates and synthetic results older than this are pruned.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_retention_days() -> u32 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Agent id the built-in host gauges are recorded under.
    pub agent_id: String,
    /// Raw gauge sampling interval; also the data-point interval of gauge level 0.
    pub sample_interval_ms: u64,
    pub flush_rate: u64,
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_flush_interval_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct RollupConfig {
    pub aggregation_interval_secs: u64,
    /// Optional cron expression for VACUUM (e.g. "0 3 * * *" = 03:00 daily). Uses local time.
    pub vacuum_schedule: Option<String>,
    #[serde(default = "default_vacuum_interval_secs")]
    pub vacuum_interval_secs: u64,
    /// Extra time, on top of the collector flush interval, that raw values may arrive late
    /// before their bucket is rolled up.
    #[serde(default = "default_ingest_grace_secs")]
    pub ingest_grace_secs: u64,
    /// Views shorter than this read raw gauge values.
    pub raw_view_threshold_millis: i64,
    /// 0 = raw gauge values never expire.
    pub raw_expiration_hours: u32,
    pub levels: Vec<RollupLevelConfig>,
}

fn default_vacuum_interval_secs() -> u64 {
    86_400
}

fn default_ingest_grace_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct RollupLevelConfig {
    pub interval_millis: i64,
    pub view_threshold_millis: i64,
    /// 0 = never expires.
    #[serde(default)]
    pub expiration_hours: u32,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// How far behind the wall clock the rollup worker stays, so buffered and late
    /// raw values land before their bucket is rolled up.
    pub fn rollup_delay_millis(&self) -> i64 {
        ((self.collector.flush_interval_secs + self.rollup.ingest_grace_secs) * 1000) as i64
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.database.retention_days > 0,
            "database.retention_days must be > 0, got {}",
            self.database.retention_days
        );
        anyhow::ensure!(
            !self.collector.agent_id.is_empty(),
            "collector.agent_id must be non-empty"
        );
        anyhow::ensure!(
            self.collector.sample_interval_ms > 0,
            "collector.sample_interval_ms must be > 0, got {}",
            self.collector.sample_interval_ms
        );
        anyhow::ensure!(
            self.collector.flush_rate > 0,
            "collector.flush_rate must be > 0, got {}",
            self.collector.flush_rate
        );
        anyhow::ensure!(
            self.collector.flush_interval_secs > 0,
            "collector.flush_interval_secs must be > 0, got {}",
            self.collector.flush_interval_secs
        );
        anyhow::ensure!(
            self.rollup.aggregation_interval_secs > 0,
            "rollup.aggregation_interval_secs must be > 0, got {}",
            self.rollup.aggregation_interval_secs
        );
        anyhow::ensure!(
            self.rollup.vacuum_interval_secs > 0,
            "rollup.vacuum_interval_secs must be > 0, got {}",
            self.rollup.vacuum_interval_secs
        );
        anyhow::ensure!(
            self.rollup.raw_view_threshold_millis > 0,
            "rollup.raw_view_threshold_millis must be > 0, got {}",
            self.rollup.raw_view_threshold_millis
        );
        anyhow::ensure!(
            !self.rollup.levels.is_empty(),
            "rollup.levels must contain at least one level"
        );
        let mut prev_interval = self.collector.sample_interval_ms as i64;
        for (i, level) in self.rollup.levels.iter().enumerate() {
            anyhow::ensure!(
                level.interval_millis > 0,
                "rollup.levels[{}].interval_millis must be > 0, got {}",
                i,
                level.interval_millis
            );
            anyhow::ensure!(
                level.interval_millis % prev_interval == 0,
                "rollup.levels[{}].interval_millis ({}) must be a multiple of {}",
                i,
                level.interval_millis,
                prev_interval
            );
            anyhow::ensure!(
                level.view_threshold_millis > 0,
                "rollup.levels[{}].view_threshold_millis must be > 0, got {}",
                i,
                level.view_threshold_millis
            );
            prev_interval = level.interval_millis;
        }
        Ok(())
    }
}
