use crate::columnar::ColumnarTable;
use crate::query_plan::{underscore_to_hyphen, QueryPlan};
use crate::request::FactorQueryRequest;
use serde::Serialize;
use serde_json::Value;

/// Response body of the factor query endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseEnvelope {
    /// Database name as sent by the client
    pub db: String,
    /// Table name as sent by the client
    pub tb: String,
    /// Requested column in hyphen form
    pub cs: String,
    /// Start bound, `YYYY-MM-DD HH:MM:SS` local time
    pub start_time: String,
    /// End bound, `YYYY-MM-DD HH:MM:SS` local time
    pub end_time: String,
    pub data: FactorSeries,
}

/// The two series extracted from the query result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorSeries {
    /// Values of the requested column
    pub data: Vec<Value>,
    /// Formatted timestamps, one per value
    pub created_at: Vec<Value>,
}

/// The result set does not match the plan it was produced from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    MissingColumn(String),
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
}

impl std::fmt::Display for ShapeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShapeError::MissingColumn(column) => {
                write!(f, "Result set is missing column '{}'", column)
            }
            ShapeError::LengthMismatch {
                column,
                expected,
                actual,
            } => write!(
                f,
                "Column '{}' has {} values, expected {}",
                column, actual, expected
            ),
        }
    }
}

impl std::error::Error for ShapeError {}

/// Converts a query result into the response envelope.
///
/// The data series is looked up by its storage (underscore) name while the
/// echoed `cs` uses the hyphen form.
pub fn shape(
    request: &FactorQueryRequest,
    plan: &QueryPlan,
    result: &ColumnarTable,
) -> Result<ResponseEnvelope, ShapeError> {
    let timestamps = result
        .column(plan.timestamp_column())
        .ok_or_else(|| ShapeError::MissingColumn(plan.timestamp_column().to_string()))?;
    let values = result
        .column(&plan.value_column)
        .ok_or_else(|| ShapeError::MissingColumn(plan.value_column.clone()))?;

    if values.len() != timestamps.len() {
        return Err(ShapeError::LengthMismatch {
            column: plan.value_column.clone(),
            expected: timestamps.len(),
            actual: values.len(),
        });
    }

    Ok(ResponseEnvelope {
        db: request.database.clone(),
        tb: request.table_name.clone(),
        cs: underscore_to_hyphen(&plan.value_column),
        start_time: plan.time_range.0.clone(),
        end_time: plan.time_range.1.clone(),
        data: FactorSeries {
            data: values.to_vec(),
            created_at: timestamps.to_vec(),
        },
    })
}
