//! Runs the full factor query path against the embedded engine, so the
//! rendered SQL is actually executed.

mod common;

use axum::http::StatusCode;
use chrono::{Local, TimeZone};
use common::{post_json, send, stock_engine};
use factor_gateway::server::{create_router, FACTOR_QUERY_PATH};
use factor_gateway::{AppState, ColumnarStore, ColumnarTable, EmbeddedEngine, SqliteDialect};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;

const START: i64 = 1_700_000_000;
const END: i64 = 1_700_003_600;

fn local(seconds: i64) -> String {
    Local
        .timestamp_opt(seconds, 0)
        .unwrap()
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Factor table with rows inside and outside the range and period.
fn factor_engine() -> EmbeddedEngine {
    let mut engine = EmbeddedEngine::new_in_memory().unwrap();
    engine.attach_schema("analytics").unwrap();

    let rows = [
        (START + 1800, 0.30, 3),
        (START - 60, 0.10, 3),
        (START, 0.20, 3),
        (END, 0.40, 3),
        (START + 600, 9.99, 1),
        (END + 1, 0.50, 3),
    ];
    let table = ColumnarTable::new()
        .with_column("created_at", rows.iter().map(|r| json!(local(r.0))).collect())
        .with_column("factor_value", rows.iter().map(|r| json!(r.1)).collect())
        .with_column("time_period", rows.iter().map(|r| json!(r.2)).collect());
    engine
        .register_columns("analytics.FACTOR_ALPHA", &table)
        .unwrap();
    engine
}

fn app() -> axum::Router {
    let store: Arc<dyn ColumnarStore> = Arc::new(Mutex::new(factor_engine()));
    let state = AppState::new(stock_engine(), store, Arc::new(SqliteDialect));
    create_router(Arc::new(state))
}

#[tokio::test]
async fn filters_by_range_and_period_in_time_order() {
    let body = json!({
        "db": "analytics",
        "tb": "factor.alpha",
        "start_time": START,
        "end_time": END,
        "cs": "factor-value",
    });

    let (status, response) = send(app(), post_json(FACTOR_QUERY_PATH, &body)).await;

    assert_eq!(status, StatusCode::OK, "response: {}", response);
    assert_eq!(response["data"]["data"], json!([0.20, 0.30, 0.40]));
    assert_eq!(
        response["data"]["created_at"],
        json!([local(START), local(START + 1800), local(END)])
    );
    assert_eq!(response["cs"], json!("factor-value"));
}

#[tokio::test]
async fn reversed_range_returns_no_rows() {
    let body = json!({
        "db": "analytics",
        "tb": "factor.alpha",
        "start_time": END,
        "end_time": START,
        "cs": "factor-value",
    });

    let (status, response) = send(app(), post_json(FACTOR_QUERY_PATH, &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["data"]["data"], json!([]));
}

#[tokio::test]
async fn unknown_table_is_execution_error() {
    let body = json!({
        "db": "analytics",
        "tb": "factor.beta",
        "start_time": START,
        "end_time": END,
        "cs": "factor-value",
    });

    let (status, response) = send(app(), post_json(FACTOR_QUERY_PATH, &body)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response["error"], json!("ExecutionError"));
}
