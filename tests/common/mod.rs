// Shared test helpers
#![allow(dead_code)]

use apmview::config::AppConfig;
use apmview::monitor_repo::MonitorRepo;
use apmview::rollup_levels::RollupLevels;
use std::sync::Arc;
use tempfile::TempDir;

pub const MINUTE: i64 = 60_000;
pub const FIVE_MINUTES: i64 = 300_000;

/// Raw samples every 10s, rollups at 1 and 5 minutes, nothing expires.
pub const TEST_CONFIG: &str = r#"
[server]
port = 8081
host = "0.0.0.0"

[database]
path = "data/test.db"
max_pool_size = 2

[collector]
agent_id = "test-agent"
sample_interval_ms = 10000
flush_rate = 5

[rollup]
aggregation_interval_secs = 60
raw_view_threshold_millis = 3600000
raw_expiration_hours = 0

[[rollup.levels]]
interval_millis = 60000
view_threshold_millis = 14400000

[[rollup.levels]]
interval_millis = 300000
view_threshold_millis = 86400000
"#;

pub fn test_config() -> AppConfig {
    AppConfig::load_from_str(TEST_CONFIG).unwrap()
}

pub fn test_levels() -> RollupLevels {
    RollupLevels::from_config(&test_config())
}

/// Fresh, initialized repo in a temp dir. Keep the TempDir alive for the test.
pub async fn temp_repo() -> (TempDir, Arc<MonitorRepo>) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("monitor.db");
    let repo = MonitorRepo::connect(path.to_str().unwrap(), 2, 30)
        .await
        .unwrap();
    repo.init().await.unwrap();
    (dir, Arc::new(repo))
}
