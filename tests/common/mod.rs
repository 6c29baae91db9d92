#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use factor_gateway::{ColumnarTable, EmbeddedEngine};
use serde_json::{json, Value};
use tower::ServiceExt;

/// Engine with a two-row `base_stock` table.
pub fn stock_engine() -> EmbeddedEngine {
    let mut engine = EmbeddedEngine::new_in_memory().unwrap();
    let stocks = ColumnarTable::new()
        .with_column("name", vec![json!("Ping An Bank"), json!("Vanke A")])
        .with_column("code", vec![json!("000001"), json!("000002")])
        .with_column("symbol", vec![json!("sz000001"), json!("sz000002")])
        .with_column("area", vec![json!("Shenzhen"), json!("Shenzhen")]);
    engine.register_columns("base_stock", &stocks).unwrap();
    engine
}

pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}
