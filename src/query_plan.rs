//! Dialect-neutral query plan for factor time-series lookups.
//!
//! Identifiers crossing the API boundary use dots and hyphens
//! (`factor.alpha`, `factor-value`); storage uses upper-case, underscore
//! separated table names and underscore separated columns. [`build`] is the
//! only place where that translation happens.

use crate::dialect::SqlDialect;
use crate::request::FactorQueryRequest;
use std::fmt;

/// Timestamp column present in every factor table.
pub const TIMESTAMP_COLUMN: &str = "created_at";
/// Categorical period column used by the fixed period filter.
pub const PERIOD_COLUMN: &str = "time_period";
/// Period code every factor query is restricted to.
pub const PERIOD_CODE: i64 = 3;
/// chrono format used for time bounds and rendered timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Normalizes a user-facing table name to its storage form.
///
/// `factor.alpha` becomes `FACTOR_ALPHA`. Applying it twice is a no-op.
pub fn normalize_table_name(table_name: &str) -> String {
    table_name.replace('.', "_").to_uppercase()
}

/// `factor-value` -> `factor_value`
pub fn hyphen_to_underscore(identifier: &str) -> String {
    identifier.replace('-', "_")
}

/// `factor_value` -> `factor-value`
pub fn underscore_to_hyphen(identifier: &str) -> String {
    identifier.replace('_', "-")
}

/// A schema-qualified table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub schema: String,
    pub table: String,
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// Scalar expressions the plan can contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Column(String),
    Str(String),
    Int(i64),
    /// Renders a timestamp column as `YYYY-MM-DD HH:MM:SS` text
    FormatTimestamp(String),
}

/// One entry of the select list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectItem {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl SelectItem {
    pub fn column(name: impl Into<String>) -> Self {
        SelectItem {
            expr: Expr::Column(name.into()),
            alias: None,
        }
    }

    pub fn aliased(expr: Expr, alias: impl Into<String>) -> Self {
        SelectItem {
            expr,
            alias: Some(alias.into()),
        }
    }
}

/// Comparison operators used in filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
        }
    }
}

/// Row filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Compare {
        column: String,
        op: CompareOp,
        value: Expr,
    },
    InList {
        column: String,
        values: Vec<Expr>,
    },
    And(Vec<Predicate>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

/// Query derived from a validated [`FactorQueryRequest`].
///
/// Built fresh per request and consumed once by the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    /// `{database}.{NORMALIZED_TABLE}`
    pub resolved_table: TableRef,
    /// Formatted timestamp expression followed by the requested column
    pub select: Vec<SelectItem>,
    /// Inclusive bounds, formatted in process-local time
    pub time_range: (String, String),
    pub filter: Predicate,
    pub order_by: Vec<OrderBy>,
    /// Storage name of the requested data column
    pub value_column: String,
}

impl QueryPlan {
    /// Name of the formatted timestamp column in the result set.
    pub fn timestamp_column(&self) -> &str {
        TIMESTAMP_COLUMN
    }

    /// Renders the plan as a query string in the given dialect.
    pub fn render(&self, dialect: &dyn SqlDialect) -> String {
        dialect.render(self)
    }
}

/// Builds the query plan for a validated request.
pub fn build(request: &FactorQueryRequest) -> QueryPlan {
    let resolved_table = TableRef {
        schema: request.database.clone(),
        table: normalize_table_name(&request.table_name),
    };
    let value_column = hyphen_to_underscore(&request.column_spec);

    let start = request.start_time.format(TIMESTAMP_FORMAT).to_string();
    let end = request.end_time.format(TIMESTAMP_FORMAT).to_string();

    let select = vec![
        SelectItem::aliased(
            Expr::FormatTimestamp(TIMESTAMP_COLUMN.to_string()),
            TIMESTAMP_COLUMN,
        ),
        SelectItem::column(value_column.clone()),
    ];

    let filter = Predicate::And(vec![
        Predicate::Compare {
            column: TIMESTAMP_COLUMN.to_string(),
            op: CompareOp::GtEq,
            value: Expr::Str(start.clone()),
        },
        Predicate::Compare {
            column: TIMESTAMP_COLUMN.to_string(),
            op: CompareOp::LtEq,
            value: Expr::Str(end.clone()),
        },
        Predicate::InList {
            column: PERIOD_COLUMN.to_string(),
            values: vec![Expr::Int(PERIOD_CODE)],
        },
    ]);

    QueryPlan {
        resolved_table,
        select,
        time_range: (start, end),
        filter,
        order_by: vec![OrderBy {
            column: TIMESTAMP_COLUMN.to_string(),
            direction: SortDirection::Ascending,
        }],
        value_column,
    }
}
