//! Route definitions for the API server

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Path of the static stock lookup
pub const BASE_STOCK_PATH: &str = "/api/analysis/v1/data/base-stock";
/// Path of the factor time-series query
pub const FACTOR_QUERY_PATH: &str = "/api/analysis/v1/factor/query";

/// Creates the main application router with all routes and middleware
pub fn create_router(state: Arc<AppState>) -> Router {
    // Any origin may call the API
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route(BASE_STOCK_PATH, get(handlers::base_stock))
        .route(FACTOR_QUERY_PATH, post(handlers::factor_query))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
