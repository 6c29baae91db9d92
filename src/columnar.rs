use serde_json::{Map, Value};

/// A single named column of a [`ColumnarTable`].
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

/// Query result organized by column.
///
/// Column order follows the order the store returned them in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnarTable {
    columns: Vec<Column>,
}

impl ColumnarTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        ColumnarTable {
            columns: Vec::new(),
        }
    }

    /// Appends a column, replacing any existing column with the same name.
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<Value>) -> Self {
        self.push_column(name, values);
        self
    }

    /// Appends a column, replacing any existing column with the same name.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<Value>) {
        let name = name.into();
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.values = values,
            None => self.columns.push(Column { name, values }),
        }
    }

    /// Builds a table from a ClickHouse `JSONColumns` document.
    ///
    /// Returns `None` if any member is not an array.
    pub fn from_json_columns(document: Map<String, Value>) -> Option<Self> {
        let mut table = ColumnarTable::new();
        for (name, values) in document {
            match values {
                Value::Array(values) => table.push_column(name, values),
                _ => return None,
            }
        }
        Some(table)
    }

    /// Values of the named column.
    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows, taken from the first column.
    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.values.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    /// Row-oriented view, one JSON object per row.
    pub fn into_records(self) -> Vec<Map<String, Value>> {
        let rows = self.num_rows();
        let mut records: Vec<Map<String, Value>> = (0..rows).map(|_| Map::new()).collect();
        for column in self.columns {
            for (record, value) in records.iter_mut().zip(column.values) {
                record.insert(column.name.clone(), value);
            }
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_columns() {
        let document = json!({
            "created_at": ["2024-01-01 00:00:00", "2024-01-01 00:01:00"],
            "factor_value": [1.5, 2.5],
        });
        let Value::Object(map) = document else {
            unreachable!()
        };
        let table = ColumnarTable::from_json_columns(map).unwrap();
        assert_eq!(table.num_columns(), 2);
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.column("factor_value").unwrap(), &[json!(1.5), json!(2.5)]);
        assert!(table.column("missing").is_none());
    }

    #[test]
    fn test_from_json_columns_keeps_store_order() {
        let document: Map<String, Value> = serde_json::from_str(
            r#"{"created_at": ["2024-01-01 00:00:00"], "a_value": [1]}"#,
        )
        .unwrap();
        let table = ColumnarTable::from_json_columns(document).unwrap();
        assert_eq!(table.column_names(), vec!["created_at", "a_value"]);

        let records = table.into_records();
        let keys: Vec<&str> = records[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["created_at", "a_value"]);
    }

    #[test]
    fn test_from_json_columns_rejects_scalars() {
        let mut map = Map::new();
        map.insert("rows".to_string(), json!(3));
        assert!(ColumnarTable::from_json_columns(map).is_none());
    }

    #[test]
    fn test_push_column_replaces_existing() {
        let table = ColumnarTable::new()
            .with_column("a", vec![json!(1)])
            .with_column("a", vec![json!(2), json!(3)]);
        assert_eq!(table.column_names(), vec!["a"]);
        assert_eq!(table.num_rows(), 2);
    }

    #[test]
    fn test_into_records() {
        let table = ColumnarTable::new()
            .with_column("name", vec![json!("Ping An"), json!("Vanke")])
            .with_column("code", vec![json!("000001"), json!("000002")]);
        let records = table.into_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["name"], json!("Vanke"));
        assert_eq!(records[0]["code"], json!("000001"));
    }

    #[test]
    fn test_empty_table() {
        let table = ColumnarTable::new();
        assert!(table.is_empty());
        assert!(table.into_records().is_empty());
    }
}
