//! Shared application state for the API server

use crate::clickhouse::ColumnarStore;
use crate::dialect::SqlDialect;
use crate::embedded::EmbeddedEngine;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared application state
///
/// Holds the process-wide database handles. They are opened once in
/// `run_server` and released when the last clone of the state is dropped.
#[derive(Clone)]
pub struct AppState {
    /// Embedded engine holding the static datasets
    /// Wrapped in Mutex because SQLite connections are not thread-safe
    pub embedded: Arc<Mutex<EmbeddedEngine>>,
    /// Remote columnar store for factor queries
    pub store: Arc<dyn ColumnarStore>,
    /// Dialect factor queries are rendered in; must match `store`
    pub dialect: Arc<dyn SqlDialect>,
    /// Service metadata reported by the health check
    pub info: ApiInfo,
}

impl AppState {
    /// Creates a new application state
    pub fn new(
        embedded: EmbeddedEngine,
        store: Arc<dyn ColumnarStore>,
        dialect: Arc<dyn SqlDialect>,
    ) -> Self {
        AppState {
            embedded: Arc::new(Mutex::new(embedded)),
            store,
            dialect,
            info: ApiInfo::default(),
        }
    }

    pub fn with_info(mut self, info: ApiInfo) -> Self {
        self.info = info;
        self
    }
}

/// Service title and version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiInfo {
    pub title: String,
    pub version: String,
}

impl Default for ApiInfo {
    fn default() -> Self {
        ApiInfo {
            title: "Factor Analysis API".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
