//! Factor Gateway Server Binary
//!
//! Run with: `cargo run --bin factor-gateway`

use factor_gateway::{run_server, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Tracing is initialized in run_server().
    // RUST_LOG overrides LOG_LEVEL, e.g.:
    //   RUST_LOG=factor_gateway=debug cargo run --bin factor-gateway
    let config = ServerConfig::from_env();

    println!("Starting Factor Gateway...");
    println!("   Listen:     http://{}", config.socket_addr());
    println!("   Dataset:    {}", config.base_stock_path().display());
    println!("   ClickHouse: {}", config.clickhouse.url);
    println!();
    println!("Available endpoints:");
    println!("  GET  /health                             - Health check");
    println!("  GET  /api/analysis/v1/data/base-stock    - Static stock list");
    println!("  POST /api/analysis/v1/factor/query       - Factor time series");
    println!();

    run_server(config).await?;

    Ok(())
}
