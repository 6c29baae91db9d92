//! Remote columnar store access.
//!
//! The gateway talks to ClickHouse over its HTTP interface and asks for
//! `JSONColumns` output, which maps directly onto [`ColumnarTable`].

use crate::columnar::ColumnarTable;
use futures::future::BoxFuture;
use reqwest::Client;
use serde_json::{Map, Value};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A store that answers SQL with a columnar table.
///
/// Implementations must be safe to share between concurrent requests.
pub trait ColumnarStore: Send + Sync {
    /// Runs a rendered query and returns its result by column.
    fn query_columns<'a>(
        &'a self,
        sql: &'a str,
    ) -> BoxFuture<'a, Result<ColumnarTable, ExecutionError>>;
}

/// Errors raised while running a query against a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// HTTP client creation failed
    ClientCreation(String),
    /// Connection or transport failure
    Network(String),
    /// The request exceeded the configured timeout
    Timeout(Duration),
    /// The store rejected the query
    Server { status: u16, message: String },
    /// The response body was not a columnar document
    Decode(String),
    /// Failure inside the embedded engine
    Engine(String),
}

impl std::fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionError::ClientCreation(msg) => write!(f, "Client creation error: {}", msg),
            ExecutionError::Network(msg) => write!(f, "Network error: {}", msg),
            ExecutionError::Timeout(after) => {
                write!(f, "Query timed out after {}s", after.as_secs())
            }
            ExecutionError::Server { status, message } => {
                write!(f, "Store error (HTTP {}): {}", status, message)
            }
            ExecutionError::Decode(msg) => write!(f, "Decode error: {}", msg),
            ExecutionError::Engine(msg) => write!(f, "Engine error: {}", msg),
        }
    }
}

impl std::error::Error for ExecutionError {}

/// Connection settings for the ClickHouse HTTP interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickHouseConfig {
    /// Base URL (default: "http://localhost:8123")
    pub url: String,
    /// User name (default: "default")
    pub username: String,
    /// Password (default: empty)
    pub password: String,
    /// Request timeout in seconds (default: 30)
    pub timeout_seconds: u64,
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        ClickHouseConfig {
            url: "http://localhost:8123".to_string(),
            username: "default".to_string(),
            password: String::new(),
            timeout_seconds: 30,
        }
    }
}

/// ClickHouse client over HTTP.
///
/// `reqwest::Client` pools connections internally, so one instance is shared
/// by all requests without extra locking.
#[derive(Debug, Clone)]
pub struct ClickHouseClient {
    client: Client,
    config: ClickHouseConfig,
}

impl ClickHouseClient {
    /// Creates a client; no connection is made until the first query.
    pub fn new(config: ClickHouseConfig) -> Result<Self, ExecutionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ExecutionError::ClientCreation(e.to_string()))?;

        Ok(ClickHouseClient { client, config })
    }

    pub fn config(&self) -> &ClickHouseConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.url.trim_end_matches('/'), path)
    }

    fn map_transport_error(&self, err: reqwest::Error) -> ExecutionError {
        if err.is_timeout() {
            ExecutionError::Timeout(Duration::from_secs(self.config.timeout_seconds))
        } else {
            ExecutionError::Network(err.to_string())
        }
    }

    /// Checks that the server answers on `/ping`.
    pub async fn ping(&self) -> Result<(), ExecutionError> {
        let response = self
            .client
            .get(self.endpoint("ping"))
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExecutionError::Server {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown error").to_string(),
            });
        }
        Ok(())
    }

    /// Sends a query and decodes the `JSONColumns` response.
    pub async fn query(&self, sql: &str) -> Result<ColumnarTable, ExecutionError> {
        let response = self
            .client
            .post(self.endpoint(""))
            .header("X-ClickHouse-User", &self.config.username)
            .header("X-ClickHouse-Key", &self.config.password)
            .query(&[("output_format_json_quote_64bit_integers", "0")])
            .body(format!("{}\nFORMAT JSONColumns", sql))
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|e| e.to_string());
            return Err(ExecutionError::Server {
                status: status.as_u16(),
                message: message.trim().to_string(),
            });
        }

        let document: Map<String, Value> = response
            .json()
            .await
            .map_err(|e| ExecutionError::Decode(e.to_string()))?;

        ColumnarTable::from_json_columns(document).ok_or_else(|| {
            ExecutionError::Decode("expected every column to be a JSON array".to_string())
        })
    }
}

impl ColumnarStore for ClickHouseClient {
    fn query_columns<'a>(
        &'a self,
        sql: &'a str,
    ) -> BoxFuture<'a, Result<ColumnarTable, ExecutionError>> {
        Box::pin(self.query(sql))
    }
}

/// Runs one query against a store, logging its duration.
///
/// No retries: a failure is returned to the caller as is.
pub async fn execute(
    store: &dyn ColumnarStore,
    sql: &str,
) -> Result<ColumnarTable, ExecutionError> {
    let started = Instant::now();
    let result = store.query_columns(sql).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match &result {
        Ok(table) => tracing::debug!(rows = table.num_rows(), elapsed_ms, "query executed"),
        Err(e) => tracing::warn!(error = %e, elapsed_ms, "query failed"),
    }

    result
}

/// In-memory store for testing.
///
/// Answers every query with the same canned result and records the SQL it
/// received.
#[derive(Debug)]
pub struct InMemoryColumnarStore {
    response: Result<ColumnarTable, ExecutionError>,
    queries: Mutex<Vec<String>>,
}

impl InMemoryColumnarStore {
    /// Store that returns `table` for every query.
    pub fn new(table: ColumnarTable) -> Self {
        InMemoryColumnarStore {
            response: Ok(table),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Store that fails every query with `error`.
    pub fn failing(error: ExecutionError) -> Self {
        InMemoryColumnarStore {
            response: Err(error),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Queries received so far, oldest first.
    pub fn queries(&self) -> Vec<String> {
        match self.queries.lock() {
            Ok(queries) => queries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Default for InMemoryColumnarStore {
    fn default() -> Self {
        Self::new(ColumnarTable::new())
    }
}

impl ColumnarStore for InMemoryColumnarStore {
    fn query_columns<'a>(
        &'a self,
        sql: &'a str,
    ) -> BoxFuture<'a, Result<ColumnarTable, ExecutionError>> {
        match self.queries.lock() {
            Ok(mut queries) => queries.push(sql.to_string()),
            Err(poisoned) => poisoned.into_inner().push(sql.to_string()),
        }
        let response = self.response.clone();
        Box::pin(async move { response })
    }
}
