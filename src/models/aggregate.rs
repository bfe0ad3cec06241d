// Transaction aggregates: timer trees, thread stats, overview rows and their merged view

use serde::{Deserialize, Serialize};
use wincode::{SchemaRead, SchemaWrite};

/// Named timer node. Children are kept in first-seen order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timer {
    pub name: String,
    #[serde(default)]
    pub extended: bool,
    pub count: i64,
    pub total_nanos: i64,
    #[serde(default)]
    pub children: Vec<Timer>,
}

impl Timer {
    /// Empty accumulator seeded with a name and extended flag.
    pub fn new(name: impl Into<String>, extended: bool) -> Self {
        Self {
            name: name.into(),
            extended,
            count: 0,
            total_nanos: 0,
            children: Vec::new(),
        }
    }

    pub fn with_totals(name: impl Into<String>, count: i64, total_nanos: i64) -> Self {
        Self {
            count,
            total_nanos,
            ..Self::new(name, false)
        }
    }

    pub fn with_child(mut self, child: Timer) -> Self {
        self.children.push(child);
        self
    }

    pub fn child(&self, name: &str) -> Option<&Timer> {
        self.children.iter().find(|c| c.name == name)
    }
}

/// Per-thread CPU, blocking, waiting and allocation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, SchemaRead, SchemaWrite)]
#[serde(rename_all = "camelCase")]
pub struct ThreadStats {
    pub total_cpu_nanos: f64,
    pub total_blocked_nanos: f64,
    pub total_waited_nanos: f64,
    pub total_allocated_bytes: f64,
}

impl ThreadStats {
    pub fn add(&mut self, other: &ThreadStats) {
        self.total_cpu_nanos += other.total_cpu_nanos;
        self.total_blocked_nanos += other.total_blocked_nanos;
        self.total_waited_nanos += other.total_waited_nanos;
        self.total_allocated_bytes += other.total_allocated_bytes;
    }
}

/// One stored aggregate row for a transaction type at a capture time.
/// `aux_thread_root_timer` and `aux_thread_stats` are present together or not at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewAggregate {
    pub capture_time: i64,
    #[serde(default)]
    pub total_duration_nanos: f64,
    pub transaction_count: i64,
    #[serde(default)]
    pub main_thread_root_timers: Vec<Timer>,
    #[serde(default)]
    pub main_thread_stats: ThreadStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aux_thread_root_timer: Option<Timer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aux_thread_stats: Option<ThreadStats>,
    #[serde(default)]
    pub async_timers: Vec<Timer>,
}

impl OverviewAggregate {
    pub fn new(capture_time: i64, transaction_count: i64) -> Self {
        Self {
            capture_time,
            total_duration_nanos: 0.0,
            transaction_count,
            main_thread_root_timers: Vec::new(),
            main_thread_stats: ThreadStats::default(),
            aux_thread_root_timer: None,
            aux_thread_stats: None,
            async_timers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedAggregate {
    pub transaction_count: i64,
    pub total_duration_nanos: f64,
    pub main_thread_root_timers: Vec<Timer>,
    pub main_thread_stats: ThreadStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aux_thread_root_timer: Option<Timer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aux_thread_stats: Option<ThreadStats>,
    pub async_timers: Vec<Timer>,
}
