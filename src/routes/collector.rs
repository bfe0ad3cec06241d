// POST handlers: ingest from agents and synthetic monitors

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;

use super::AppState;
use super::error::ApiError;
use crate::models::{GaugeReading, OverviewAggregate, SyntheticResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GaugeValuesRequest {
    agent_id: String,
    gauge_values: Vec<GaugeReading>,
}

/// POST /backend/collector/gauge-values: raw gauge values (level 0).
pub(super) async fn gauge_values_handler(
    State(state): State<AppState>,
    Json(request): Json<GaugeValuesRequest>,
) -> Result<StatusCode, ApiError> {
    if let Some(bad) = request.gauge_values.iter().find(|v| v.weight <= 0) {
        return Err(ApiError::BadRequest(format!(
            "gauge {} at {} has non-positive weight {}",
            bad.gauge_name, bad.capture_time, bad.weight
        )));
    }
    state
        .repo
        .save_gauge_readings(&request.agent_id, 0, &request.gauge_values)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AggregatesRequest {
    agent_id: String,
    transaction_type: String,
    aggregates: Vec<OverviewAggregate>,
}

/// POST /backend/collector/aggregates
pub(super) async fn aggregates_handler(
    State(state): State<AppState>,
    Json(request): Json<AggregatesRequest>,
) -> Result<StatusCode, ApiError> {
    // merging treats a lone aux timer as an upstream bug, so reject it here
    if let Some(bad) = request
        .aggregates
        .iter()
        .find(|a| a.aux_thread_root_timer.is_some() != a.aux_thread_stats.is_some())
    {
        return Err(ApiError::BadRequest(format!(
            "aggregate at {} must carry both or neither of auxThreadRootTimer and auxThreadStats",
            bad.capture_time
        )));
    }
    state
        .repo
        .save_aggregates(
            &request.agent_id,
            &request.transaction_type,
            &request.aggregates,
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SyntheticResultsRequest {
    source_id: String,
    results: Vec<SyntheticResult>,
}

/// POST /backend/collector/synthetic-results
pub(super) async fn synthetic_results_handler(
    State(state): State<AppState>,
    Json(request): Json<SyntheticResultsRequest>,
) -> Result<StatusCode, ApiError> {
    for result in &request.results {
        if let Some(bad) = result.error_intervals.iter().find(|e| e.from > e.to) {
            return Err(ApiError::BadRequest(format!(
                "result at {} has error interval with from {} after to {}",
                result.capture_time, bad.from, bad.to
            )));
        }
        if let Some(pair) = result
            .error_intervals
            .windows(2)
            .find(|pair| pair[0].from > pair[1].from)
        {
            return Err(ApiError::BadRequest(format!(
                "result at {} has error intervals out of from order ({} before {})",
                result.capture_time, pair[0].from, pair[1].from
            )));
        }
    }
    state
        .repo
        .save_synthetic_results(&request.source_id, &request.results)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
