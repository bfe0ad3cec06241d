// Chart core: pure, synchronous transforms over already-fetched data. No I/O, no logging.

pub mod aggregate_merging;
pub mod capture_time;
pub mod data_series_helper;
pub mod error_intervals;
pub mod gauge_rollup;

pub use aggregate_merging::{merge_aggregates, merge_root_timers};
pub use capture_time::{rollup_ceil, rollup_floor};
pub use data_series_helper::DataSeriesHelper;
pub use error_intervals::{MultiErrorIntervalCollector, MultiErrorIntervalMerger};
pub use gauge_rollup::{rollup_gauge_values, sync_manual_rollup_capture_times};
