// Domain models shared by the repo, the chart core and the JSON services

mod aggregate;
mod error_interval;
mod gauge;
mod series;

pub use aggregate::{MergedAggregate, OverviewAggregate, ThreadStats, Timer};
pub use error_interval::{
    ErrorInterval, GroupedMultiErrorInterval, MultiErrorInterval, SyntheticResult,
};
pub use gauge::{GaugeReading, GaugeValue, weighted_average};
pub use series::{DataPoint, DataSeries};
