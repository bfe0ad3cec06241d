// Gauge rollup levels: level 0 is raw samples at the collector interval, level i > 0 is
// rollup.levels[i - 1]. Picks the level a chart of [from, to] should read.

use crate::config::{AppConfig, RollupLevelConfig};

const MS_PER_HOUR: i64 = 3_600_000;

#[derive(Debug, Clone)]
pub struct RollupLevels {
    sample_interval_millis: i64,
    raw_view_threshold_millis: i64,
    raw_expiration_hours: u32,
    levels: Vec<RollupLevelConfig>,
}

impl RollupLevels {
    pub fn new(
        sample_interval_millis: i64,
        raw_view_threshold_millis: i64,
        raw_expiration_hours: u32,
        levels: Vec<RollupLevelConfig>,
    ) -> Self {
        Self {
            sample_interval_millis,
            raw_view_threshold_millis,
            raw_expiration_hours,
            levels,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.collector.sample_interval_ms as i64,
            config.rollup.raw_view_threshold_millis,
            config.rollup.raw_expiration_hours,
            config.rollup.levels.clone(),
        )
    }

    /// Highest gauge level (the coarsest rollup).
    pub fn largest_gauge_level(&self) -> usize {
        self.levels.len()
    }

    pub fn gauge_interval_millis(&self, level: usize) -> i64 {
        match level {
            0 => self.sample_interval_millis,
            _ => self.levels[level - 1].interval_millis,
        }
    }

    /// `None` when values at this level never expire.
    pub fn gauge_expiration_millis(&self, level: usize) -> Option<i64> {
        let hours = match level {
            0 => self.raw_expiration_hours,
            _ => self.levels[level - 1].expiration_hours,
        };
        (hours > 0).then(|| hours as i64 * MS_PER_HOUR)
    }

    /// Data-point interval of transaction aggregates and synthetic results.
    pub fn aggregate_interval_millis(&self) -> i64 {
        self.levels[0].interval_millis
    }

    pub fn gauge_level_for_view(&self, from: i64, to: i64, now: i64) -> usize {
        let millis = to - from;
        let time_ago_millis = now - from;
        let covers = |level: usize| {
            self.gauge_expiration_millis(level)
                .is_none_or(|expiration| expiration > time_ago_millis)
        };
        if millis < self.raw_view_threshold_millis && covers(0) {
            return 0;
        }
        let last = self.levels.len() - 1;
        for (i, level) in self.levels[..last].iter().enumerate() {
            if millis < level.view_threshold_millis && covers(i + 1) {
                return i + 1;
            }
        }
        self.largest_gauge_level()
    }
}
