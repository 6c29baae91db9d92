//! Embedded analytical engine backed by an in-memory SQLite connection.
//!
//! Static datasets (Parquet or CSV files) are loaded into tables once at
//! startup and queried with plain SQL afterwards.

use crate::clickhouse::{ColumnarStore, ExecutionError};
use crate::columnar::ColumnarTable;
use crate::dialect::{SqlDialect, SqliteDialect};
use futures::future::BoxFuture;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde_json::{Map, Number, Value};
use std::fs::File;
use std::path::Path;
use tokio::sync::Mutex;

/// Errors raised by the embedded engine.
#[derive(Debug)]
pub enum EmbeddedError {
    /// SQLite rejected a statement
    Sqlite(rusqlite::Error),
    /// Dataset file could not be opened
    Io(std::io::Error),
    /// Dataset file is not valid Parquet
    Parquet(String),
    /// Dataset file is not valid CSV
    Csv(String),
    /// File extension is neither `.parquet` nor `.csv`
    UnsupportedFormat(String),
    /// A dataset without any column
    EmptySchema(String),
}

impl std::fmt::Display for EmbeddedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddedError::Sqlite(e) => write!(f, "SQL error: {}", e),
            EmbeddedError::Io(e) => write!(f, "I/O error: {}", e),
            EmbeddedError::Parquet(msg) => write!(f, "Parquet error: {}", msg),
            EmbeddedError::Csv(msg) => write!(f, "CSV error: {}", msg),
            EmbeddedError::UnsupportedFormat(path) => {
                write!(f, "Unsupported dataset format: {}", path)
            }
            EmbeddedError::EmptySchema(name) => write!(f, "Dataset '{}' has no columns", name),
        }
    }
}

impl std::error::Error for EmbeddedError {}

impl From<rusqlite::Error> for EmbeddedError {
    fn from(err: rusqlite::Error) -> Self {
        EmbeddedError::Sqlite(err)
    }
}

impl From<std::io::Error> for EmbeddedError {
    fn from(err: std::io::Error) -> Self {
        EmbeddedError::Io(err)
    }
}

impl From<parquet::errors::ParquetError> for EmbeddedError {
    fn from(err: parquet::errors::ParquetError) -> Self {
        EmbeddedError::Parquet(err.to_string())
    }
}

impl From<csv::Error> for EmbeddedError {
    fn from(err: csv::Error) -> Self {
        EmbeddedError::Csv(err.to_string())
    }
}

/// In-process query engine over locally loaded tables.
#[derive(Debug)]
pub struct EmbeddedEngine {
    conn: Connection,
}

impl EmbeddedEngine {
    /// Opens an empty in-memory engine.
    pub fn new_in_memory() -> Result<Self, EmbeddedError> {
        let conn = Connection::open_in_memory()?;
        Ok(EmbeddedEngine { conn })
    }

    /// Attaches an empty in-memory schema so `schema.table` names resolve.
    pub fn attach_schema(&self, schema: &str) -> Result<(), EmbeddedError> {
        self.conn.execute(
            &format!(
                "ATTACH DATABASE ':memory:' AS {}",
                SqliteDialect.quote_identifier(schema)
            ),
            [],
        )?;
        Ok(())
    }

    /// Loads a Parquet or CSV file into table `name`, replacing any previous
    /// table of that name.
    ///
    /// # Returns
    /// The number of rows loaded.
    pub fn register_table<P: AsRef<Path>>(
        &mut self,
        name: &str,
        path: P,
    ) -> Result<usize, EmbeddedError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let table = match extension.as_deref() {
            Some("parquet") => read_parquet(path)?,
            Some("csv") => read_csv(path)?,
            _ => return Err(EmbeddedError::UnsupportedFormat(path.display().to_string())),
        };

        let rows = self.register_columns(name, &table)?;
        tracing::info!(table = name, rows, path = %path.display(), "registered dataset");
        Ok(rows)
    }

    /// Creates table `name` from an in-memory columnar table.
    pub fn register_columns(
        &mut self,
        name: &str,
        table: &ColumnarTable,
    ) -> Result<usize, EmbeddedError> {
        let columns = table.column_names();
        if columns.is_empty() {
            return Err(EmbeddedError::EmptySchema(name.to_string()));
        }

        let qualified = quote_table_name(name);
        let definitions = columns
            .iter()
            .map(|c| SqliteDialect.quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=columns.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");

        let tx = self.conn.transaction()?;
        tx.execute(&format!("DROP TABLE IF EXISTS {}", qualified), [])?;
        tx.execute(&format!("CREATE TABLE {} ({})", qualified, definitions), [])?;
        {
            let mut insert = tx.prepare(&format!(
                "INSERT INTO {} VALUES ({})",
                qualified, placeholders
            ))?;
            for row in 0..table.num_rows() {
                let values = columns.iter().map(|c| {
                    table
                        .column(c)
                        .and_then(|values| values.get(row))
                        .map(to_sql_value)
                        .unwrap_or(SqlValue::Null)
                });
                insert.execute(params_from_iter(values))?;
            }
        }
        tx.commit()?;

        Ok(table.num_rows())
    }

    /// Runs a query and returns the result by column.
    pub fn query(&self, sql: &str) -> Result<ColumnarTable, EmbeddedError> {
        let mut stmt = self.conn.prepare(sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut columns: Vec<Vec<Value>> = vec![Vec::new(); names.len()];

        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            for (i, column) in columns.iter_mut().enumerate() {
                column.push(from_sql_value(row.get_ref(i)?));
            }
        }

        let mut table = ColumnarTable::new();
        for (name, values) in names.into_iter().zip(columns) {
            table.push_column(name, values);
        }
        Ok(table)
    }

    /// Runs a query and returns one JSON object per row.
    pub fn query_records(&self, sql: &str) -> Result<Vec<Map<String, Value>>, EmbeddedError> {
        Ok(self.query(sql)?.into_records())
    }
}

impl ColumnarStore for Mutex<EmbeddedEngine> {
    fn query_columns<'a>(
        &'a self,
        sql: &'a str,
    ) -> BoxFuture<'a, Result<ColumnarTable, ExecutionError>> {
        Box::pin(async move {
            let engine = self.lock().await;
            engine
                .query(sql)
                .map_err(|e| ExecutionError::Engine(e.to_string()))
        })
    }
}

fn quote_table_name(name: &str) -> String {
    match name.split_once('.') {
        Some((schema, table)) => format!(
            "{}.{}",
            SqliteDialect.quote_identifier(schema),
            SqliteDialect.quote_identifier(table)
        ),
        None => SqliteDialect.quote_identifier(name),
    }
}

fn read_parquet(path: &Path) -> Result<ColumnarTable, EmbeddedError> {
    let reader = SerializedFileReader::new(File::open(path)?)?;
    let names: Vec<String> = reader
        .metadata()
        .file_metadata()
        .schema()
        .get_fields()
        .iter()
        .map(|field| field.name().to_string())
        .collect();
    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); names.len()];

    for row in reader.get_row_iter(None)? {
        let row = row?;
        for (i, (_, field)) in row.get_column_iter().enumerate() {
            if let Some(column) = columns.get_mut(i) {
                column.push(from_parquet_field(field));
            }
        }
    }

    let mut table = ColumnarTable::new();
    for (name, values) in names.into_iter().zip(columns) {
        table.push_column(name, values);
    }
    Ok(table)
}

/// CSV values are loaded as text; leading zeros in codes are preserved.
fn read_csv(path: &Path) -> Result<ColumnarTable, EmbeddedError> {
    let mut reader = csv::Reader::from_path(path)?;
    let names: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); names.len()];

    for record in reader.records() {
        let record = record?;
        for (column, value) in columns.iter_mut().zip(record.iter()) {
            column.push(Value::String(value.to_string()));
        }
    }

    let mut table = ColumnarTable::new();
    for (name, values) in names.into_iter().zip(columns) {
        table.push_column(name, values);
    }
    Ok(table)
}

fn from_parquet_field(field: &Field) -> Value {
    match field {
        Field::Null => Value::Null,
        Field::Bool(v) => Value::Bool(*v),
        Field::Byte(v) => Value::from(*v),
        Field::Short(v) => Value::from(*v),
        Field::Int(v) => Value::from(*v),
        Field::Long(v) => Value::from(*v),
        Field::UByte(v) => Value::from(*v),
        Field::UShort(v) => Value::from(*v),
        Field::UInt(v) => Value::from(*v),
        Field::ULong(v) => Value::from(*v),
        Field::Float(v) => float_value(f64::from(*v)),
        Field::Double(v) => float_value(*v),
        Field::Str(s) => Value::String(s.clone()),
        other => Value::String(other.to_string()),
    }
}

fn float_value(v: f64) -> Value {
    Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn from_sql_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => float_value(f),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::from(bytes.to_vec()),
    }
}
