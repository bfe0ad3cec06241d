// JSON services: read from the repo, run the chart core, hand back serializable responses

pub mod gauge;
pub mod synthetic;
pub mod transaction;

pub use gauge::{GaugeService, GaugeValuesResponse};
pub use synthetic::{SyntheticResultsResponse, SyntheticService};
pub use transaction::{TransactionOverviewResponse, TransactionService};

/// Wall-clock capture time in epoch millis.
pub fn current_time_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, operation = "get_timestamp", "system time error");
            0
        })
}
