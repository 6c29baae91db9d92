//! REST API server for the factor gateway

mod error;
mod handlers;
mod routes;
mod state;

pub use error::ApiError;
pub use handlers::BASE_STOCK_TABLE;
pub use routes::{create_router, BASE_STOCK_PATH, FACTOR_QUERY_PATH};
pub use state::{ApiInfo, AppState};

use crate::clickhouse::{ClickHouseClient, ClickHouseConfig};
use crate::dialect::ClickHouseDialect;
use crate::embedded::EmbeddedEngine;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Server host address (default: "127.0.0.1")
    pub host: String,
    /// Server port (default: 3000)
    pub port: u16,
    /// Directory holding the static datasets (default: "data")
    pub data_dir: PathBuf,
    /// File name of the stock dataset inside `data_dir` (default: "stock_300.parquet")
    pub base_stock_file: String,
    /// Remote store connection
    pub clickhouse: ClickHouseConfig,
    /// Service title and version reported by `/health`
    pub info: ApiInfo,
    /// Log filter used when RUST_LOG is not set (default: "info")
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            data_dir: PathBuf::from("data"),
            base_stock_file: "stock_300.parquet".to_string(),
            clickhouse: ClickHouseConfig::default(),
            info: ApiInfo::default(),
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Reads the configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from a key lookup, falling back to defaults
    /// for missing or unparsable values.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ServerConfig::default();
        let string = |key: &str, default: String| lookup(key).unwrap_or(default);

        ServerConfig {
            host: string("HOST", defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            data_dir: lookup("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            base_stock_file: string("BASE_STOCK_FILE", defaults.base_stock_file),
            clickhouse: ClickHouseConfig {
                url: string("CLICKHOUSE_URL", defaults.clickhouse.url),
                username: string("CLICKHOUSE_USER", defaults.clickhouse.username),
                password: string("CLICKHOUSE_PASSWORD", defaults.clickhouse.password),
                timeout_seconds: lookup("CLICKHOUSE_TIMEOUT_SECS")
                    .and_then(|t| t.parse().ok())
                    .filter(|t: &u64| *t > 0)
                    .unwrap_or(defaults.clickhouse.timeout_seconds),
            },
            info: ApiInfo {
                title: string("API_TITLE", defaults.info.title),
                version: string("API_VERSION", defaults.info.version),
            },
            log_level: string("LOG_LEVEL", defaults.log_level),
        }
    }

    /// Full path of the stock dataset
    pub fn base_stock_path(&self) -> PathBuf {
        self.data_dir.join(&self.base_stock_file)
    }

    /// Address the listener binds to
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins over `log_level` when set.
pub fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    // A subscriber may already be installed (tests, embedding binaries).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}

/// Runs the API server
///
/// Opens the embedded engine and the remote store client, serves until
/// Ctrl-C or SIGTERM, then releases both handles.
///
/// # Example
/// ```rust,no_run
/// use factor_gateway::server::{run_server, ServerConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     run_server(ServerConfig::from_env()).await?;
///     Ok(())
/// }
/// ```
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(&config.log_level);

    let mut embedded = EmbeddedEngine::new_in_memory()?;
    embedded.register_table(BASE_STOCK_TABLE, config.base_stock_path())?;

    let clickhouse = ClickHouseClient::new(config.clickhouse.clone())?;
    match clickhouse.ping().await {
        Ok(()) => tracing::info!(url = %config.clickhouse.url, "ClickHouse reachable"),
        Err(e) => tracing::warn!(url = %config.clickhouse.url, error = %e, "ClickHouse not reachable at startup"),
    }

    let state = Arc::new(
        AppState::new(embedded, Arc::new(clickhouse), Arc::new(ClickHouseDialect))
            .with_info(config.info.clone()),
    );
    let app = create_router(Arc::clone(&state));

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    drop(state);
    tracing::info!("Server stopped, database handles released");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.socket_addr(), "127.0.0.1:3000");
        assert_eq!(config.base_stock_path(), PathBuf::from("data/stock_300.parquet"));
        assert_eq!(config.clickhouse.url, "http://localhost:8123");
    }

    #[test]
    fn test_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("PORT", "8080"),
            ("DATA_DIR", "/srv/data"),
            ("CLICKHOUSE_PASSWORD", "secret"),
            ("CLICKHOUSE_TIMEOUT_SECS", "5"),
            ("API_TITLE", "Analysis"),
        ]
        .into_iter()
        .collect();

        let config = ServerConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.base_stock_path(), PathBuf::from("/srv/data/stock_300.parquet"));
        assert_eq!(config.clickhouse.password, "secret");
        assert_eq!(config.clickhouse.timeout_seconds, 5);
        assert_eq!(config.info.title, "Analysis");
    }

    #[test]
    fn test_config_ignores_unparsable_numbers() {
        let config = ServerConfig::from_lookup(|key| match key {
            "PORT" => Some("not-a-port".to_string()),
            "CLICKHOUSE_TIMEOUT_SECS" => Some("-1".to_string()),
            _ => None,
        });
        assert_eq!(config.port, 3000);
        assert_eq!(config.clickhouse.timeout_seconds, 30);
    }

    #[test]
    fn test_config_rejects_zero_timeout() {
        let config = ServerConfig::from_lookup(|key| match key {
            "CLICKHOUSE_TIMEOUT_SECS" => Some("0".to_string()),
            _ => None,
        });
        assert_eq!(config.clickhouse.timeout_seconds, 30);
    }
}
