pub mod request;
pub mod query_plan;
pub mod dialect;
pub mod columnar;
pub mod clickhouse;
pub mod response;
pub mod embedded;
pub mod server;

pub use request::{validate, FactorQueryRequest, RawFactorQuery, ValidationError};
pub use query_plan::{build, QueryPlan, TableRef};
pub use dialect::{ClickHouseDialect, SqlDialect, SqliteDialect};
pub use columnar::{Column, ColumnarTable};
pub use clickhouse::{
    execute, ClickHouseClient, ClickHouseConfig, ColumnarStore, ExecutionError,
    InMemoryColumnarStore,
};
pub use response::{shape, FactorSeries, ResponseEnvelope, ShapeError};
pub use embedded::{EmbeddedEngine, EmbeddedError};
pub use server::{run_server, ApiError, ApiInfo, AppState, ServerConfig};
