// HTTP routes

mod collector;
mod error;
mod http;

pub use error::ApiError;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::monitor_repo::MonitorRepo;
use crate::rollup_levels::RollupLevels;
use crate::services::{GaugeService, SyntheticService, TransactionService};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) repo: Arc<MonitorRepo>,
    pub(crate) gauge_service: Arc<GaugeService>,
    pub(crate) transaction_service: Arc<TransactionService>,
    pub(crate) synthetic_service: Arc<SyntheticService>,
}

pub fn app(repo: Arc<MonitorRepo>, levels: RollupLevels) -> Router {
    let state = AppState {
        gauge_service: Arc::new(GaugeService::new(repo.clone(), levels.clone())),
        transaction_service: Arc::new(TransactionService::new(repo.clone(), levels.clone())),
        synthetic_service: Arc::new(SyntheticService::new(repo.clone(), levels)),
        repo,
    };
    Router::new()
        .route("/version", get(http::version_handler)) // GET /version
        .route("/backend/jvm/gauges", get(http::gauges_handler)) // GET /backend/jvm/gauges
        .route(
            "/backend/transaction/overview",
            get(http::transaction_overview_handler),
        ) // GET /backend/transaction/overview
        .route(
            "/backend/synthetic-monitor/results",
            get(http::synthetic_results_handler),
        ) // GET /backend/synthetic-monitor/results
        .route(
            "/backend/collector/gauge-values",
            post(collector::gauge_values_handler),
        ) // POST /backend/collector/gauge-values
        .route(
            "/backend/collector/aggregates",
            post(collector::aggregates_handler),
        ) // POST /backend/collector/aggregates
        .route(
            "/backend/collector/synthetic-results",
            post(collector::synthetic_results_handler),
        ) // POST /backend/collector/synthetic-results
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
