//! SQL dialects a [`QueryPlan`] can be rendered into.

use crate::query_plan::{Expr, Predicate, QueryPlan, SelectItem, SortDirection, TableRef};

/// Dialect-specific pieces of SQL rendering.
///
/// Implementors only describe quoting and the timestamp formatting
/// function; the statement layout is shared by [`SqlDialect::render`].
pub trait SqlDialect: Send + Sync {
    /// Short dialect name used in logs
    fn name(&self) -> &'static str;

    /// Quotes an identifier if it is not a plain word.
    fn quote_identifier(&self, identifier: &str) -> String;

    /// Renders a string literal with the dialect's escaping rules.
    fn string_literal(&self, value: &str) -> String;

    /// Expression formatting `column` as `YYYY-MM-DD HH:MM:SS` text.
    fn format_timestamp(&self, column: &str) -> String;

    /// Renders a full `SELECT` statement for the plan.
    fn render(&self, plan: &QueryPlan) -> String {
        render_plan(self, plan)
    }
}

/// ClickHouse, the remote columnar store.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClickHouseDialect;

impl SqlDialect for ClickHouseDialect {
    fn name(&self) -> &'static str {
        "clickhouse"
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        if is_plain_identifier(identifier) {
            identifier.to_string()
        } else {
            format!("`{}`", identifier.replace('\\', "\\\\").replace('`', "\\`"))
        }
    }

    fn string_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
    }

    fn format_timestamp(&self, column: &str) -> String {
        format!(
            "formatDateTime({}, '%Y-%m-%d %H:%i:%S')",
            self.quote_identifier(column)
        )
    }
}

/// SQLite, used by the embedded engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        if is_plain_identifier(identifier) {
            identifier.to_string()
        } else {
            format!("\"{}\"", identifier.replace('"', "\"\""))
        }
    }

    fn string_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    fn format_timestamp(&self, column: &str) -> String {
        format!(
            "strftime('%Y-%m-%d %H:%M:%S', {})",
            self.quote_identifier(column)
        )
    }
}

fn is_plain_identifier(identifier: &str) -> bool {
    let mut chars = identifier.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn render_plan<D: SqlDialect + ?Sized>(dialect: &D, plan: &QueryPlan) -> String {
    let select = plan
        .select
        .iter()
        .map(|item| render_select_item(dialect, item))
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!(
        "SELECT {} FROM {} WHERE {}",
        select,
        render_table(dialect, &plan.resolved_table),
        render_predicate(dialect, &plan.filter, false)
    );

    if !plan.order_by.is_empty() {
        let order = plan
            .order_by
            .iter()
            .map(|o| match o.direction {
                SortDirection::Ascending => dialect.quote_identifier(&o.column),
                SortDirection::Descending => {
                    format!("{} DESC", dialect.quote_identifier(&o.column))
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(" ORDER BY ");
        sql.push_str(&order);
    }

    sql
}

fn render_table<D: SqlDialect + ?Sized>(dialect: &D, table: &TableRef) -> String {
    format!(
        "{}.{}",
        dialect.quote_identifier(&table.schema),
        dialect.quote_identifier(&table.table)
    )
}

fn render_select_item<D: SqlDialect + ?Sized>(dialect: &D, item: &SelectItem) -> String {
    let expr = render_expr(dialect, &item.expr);
    match &item.alias {
        Some(alias) => format!("{} AS {}", expr, dialect.quote_identifier(alias)),
        None => expr,
    }
}

fn render_expr<D: SqlDialect + ?Sized>(dialect: &D, expr: &Expr) -> String {
    match expr {
        Expr::Column(name) => dialect.quote_identifier(name),
        Expr::Str(value) => dialect.string_literal(value),
        Expr::Int(value) => value.to_string(),
        Expr::FormatTimestamp(column) => dialect.format_timestamp(column),
    }
}

fn render_predicate<D: SqlDialect + ?Sized>(
    dialect: &D,
    predicate: &Predicate,
    nested: bool,
) -> String {
    match predicate {
        Predicate::Compare { column, op, value } => format!(
            "{} {} {}",
            dialect.quote_identifier(column),
            op.as_sql(),
            render_expr(dialect, value)
        ),
        Predicate::InList { column, values } => {
            let values = values
                .iter()
                .map(|v| render_expr(dialect, v))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{} IN ({})", dialect.quote_identifier(column), values)
        }
        Predicate::And(parts) => {
            let joined = parts
                .iter()
                .map(|p| render_predicate(dialect, p, true))
                .collect::<Vec<_>>()
                .join(" AND ");
            if nested && parts.len() > 1 {
                format!("({})", joined)
            } else {
                joined
            }
        }
    }
}
