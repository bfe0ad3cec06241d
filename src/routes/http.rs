// GET handlers: version and chart data

use axum::Json;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;

use super::AppState;
use super::error::ApiError;
use crate::services::current_time_millis;
use crate::services::transaction::DEFAULT_TIMER_LIMIT;
use crate::services::{GaugeValuesResponse, SyntheticResultsResponse, TransactionOverviewResponse};
use crate::version::{NAME, VERSION};

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(super) struct GaugeQuery {
    agent_id: String,
    /// Comma-separated gauge names.
    gauge_names: String,
    from: i64,
    to: i64,
}

/// GET /backend/jvm/gauges?agent-id=..&gauge-names=a,b&from=..&to=..
pub(super) async fn gauges_handler(
    State(state): State<AppState>,
    Query(query): Query<GaugeQuery>,
) -> Result<Json<GaugeValuesResponse>, ApiError> {
    check_range(query.from, query.to)?;
    let gauge_names = split_list(&query.gauge_names);
    if gauge_names.is_empty() {
        return Err(ApiError::BadRequest("gauge-names must not be empty".into()));
    }
    let response = state
        .gauge_service
        .get_gauge_values(
            &query.agent_id,
            &gauge_names,
            query.from,
            query.to,
            current_time_millis(),
        )
        .await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(super) struct TransactionQuery {
    agent_id: String,
    transaction_type: String,
    from: i64,
    to: i64,
    limit: Option<usize>,
}

/// GET /backend/transaction/overview?agent-id=..&transaction-type=..&from=..&to=..[&limit=..]
pub(super) async fn transaction_overview_handler(
    State(state): State<AppState>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<TransactionOverviewResponse>, ApiError> {
    check_range(query.from, query.to)?;
    let response = state
        .transaction_service
        .get_overview(
            &query.agent_id,
            &query.transaction_type,
            query.from,
            query.to,
            current_time_millis(),
            query.limit.unwrap_or(DEFAULT_TIMER_LIMIT),
        )
        .await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(super) struct SyntheticQuery {
    /// Comma-separated synthetic monitor ids.
    source_ids: String,
    from: i64,
    to: i64,
}

/// GET /backend/synthetic-monitor/results?source-ids=a,b&from=..&to=..
pub(super) async fn synthetic_results_handler(
    State(state): State<AppState>,
    Query(query): Query<SyntheticQuery>,
) -> Result<Json<SyntheticResultsResponse>, ApiError> {
    check_range(query.from, query.to)?;
    let source_ids = split_list(&query.source_ids);
    if source_ids.is_empty() {
        return Err(ApiError::BadRequest("source-ids must not be empty".into()));
    }
    let response = state
        .synthetic_service
        .get_results(&source_ids, query.from, query.to, current_time_millis())
        .await?;
    Ok(Json(response))
}

fn check_range(from: i64, to: i64) -> Result<(), ApiError> {
    if from > to {
        return Err(ApiError::BadRequest(format!(
            "from ({}) must not be after to ({})",
            from, to
        )));
    }
    Ok(())
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}
