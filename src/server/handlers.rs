//! HTTP request handlers for API endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::error::ApiError;
use super::state::AppState;
use crate::clickhouse;
use crate::query_plan;
use crate::request::{validate, RawFactorQuery};
use crate::response::{self, ResponseEnvelope};

/// Table the static stock dataset is registered under
pub const BASE_STOCK_TABLE: &str = "base_stock";

const BASE_STOCK_QUERY: &str = "select name,code,symbol from base_stock";

/// Health check endpoint
///
/// Returns a simple status response to verify the server is running
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "title": state.info.title,
        "version": state.info.version,
    }))
}

/// GET /api/analysis/v1/data/base-stock - List every stock in the static dataset
pub async fn base_stock(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Map<String, Value>>>, ApiError> {
    let engine = state.embedded.lock().await;
    let records = engine.query_records(BASE_STOCK_QUERY)?;
    Ok(Json(records))
}

/// POST /api/analysis/v1/factor/query - Fetch one factor column over a time range
///
/// Validation failures are reported before anything is sent to the store.
pub async fn factor_query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RawFactorQuery>, JsonRejection>,
) -> Result<Json<ResponseEnvelope>, ApiError> {
    let Json(raw) = payload.map_err(|e| ApiError::InvalidBody(e.body_text()))?;
    let request = validate(raw)?;

    let plan = query_plan::build(&request);
    let sql = plan.render(state.dialect.as_ref());
    tracing::debug!(
        table = %plan.resolved_table,
        dialect = state.dialect.name(),
        sql = %sql,
        "built factor query"
    );

    let result = clickhouse::execute(state.store.as_ref(), &sql)
        .await
        .map_err(|e| {
            tracing::error!(table = %plan.resolved_table, error = %e, "factor query execution failed");
            ApiError::from(e)
        })?;

    let envelope = response::shape(&request, &plan, &result).map_err(|e| {
        tracing::error!(
            table = %plan.resolved_table,
            columns = ?result.column_names(),
            error = %e,
            "factor result does not match query plan"
        );
        ApiError::from(e)
    })?;

    Ok(Json(envelope))
}
