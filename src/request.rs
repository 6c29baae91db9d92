use chrono::{DateTime, Local, TimeZone};
use serde::Deserialize;

/// Factor query body as it arrives on the wire.
///
/// Missing keys and JSON `null` both read as absent, so the ordered checks
/// in [`validate`] decide which field is reported. Unknown keys and wrongly
/// typed values are rejected by serde before validation runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawFactorQuery {
    /// Database (schema) name
    #[serde(default)]
    pub db: Option<String>,
    /// User-facing table identifier, e.g. `factor.alpha`
    #[serde(default)]
    pub tb: Option<String>,
    /// Start of the time range in unix seconds
    #[serde(default)]
    pub start_time: Option<i64>,
    /// End of the time range in unix seconds
    #[serde(default)]
    pub end_time: Option<i64>,
    /// Column to fetch, hyphen separated, e.g. `factor-value`
    #[serde(default)]
    pub cs: Option<String>,
}

/// A factor query that passed validation.
///
/// Identifiers are kept exactly as the client sent them; normalization to
/// storage conventions happens in the query builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactorQueryRequest {
    pub database: String,
    pub table_name: String,
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    pub column_spec: String,
}

/// Reasons a factor query is rejected before any query is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required identifier is empty or missing
    MissingField(&'static str),
    /// A field is present but unusable
    InvalidField(&'static str),
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingField(field) | ValidationError::InvalidField(field) => *field,
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::MissingField("database") => write!(f, "Database name is required"),
            ValidationError::MissingField("table") => write!(f, "Table name is required"),
            ValidationError::InvalidField("start_time") => write!(f, "Start time is required"),
            ValidationError::InvalidField("end_time") => write!(f, "End time is required"),
            ValidationError::InvalidField("columns") => {
                write!(f, "Columns must be a non-empty list")
            }
            ValidationError::MissingField(field) => write!(f, "Missing field: {}", field),
            ValidationError::InvalidField(field) => write!(f, "Invalid field: {}", field),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validates a raw factor query.
///
/// Checks run in a fixed order and stop at the first failure:
/// `db`, `tb`, `start_time`, `end_time`, `cs`. There is no cross-field
/// check, so `end_time < start_time` is accepted.
pub fn validate(raw: RawFactorQuery) -> Result<FactorQueryRequest, ValidationError> {
    let database = non_empty(raw.db).ok_or(ValidationError::MissingField("database"))?;
    let table_name = non_empty(raw.tb).ok_or(ValidationError::MissingField("table"))?;

    let start_time = local_time_bound(raw.start_time)
        .ok_or(ValidationError::InvalidField("start_time"))?;
    let end_time =
        local_time_bound(raw.end_time).ok_or(ValidationError::InvalidField("end_time"))?;

    let column_spec = non_empty(raw.cs).ok_or(ValidationError::InvalidField("columns"))?;

    Ok(FactorQueryRequest {
        database,
        table_name,
        start_time,
        end_time,
        column_spec,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Converts a positive unix timestamp into the process-local time zone.
///
/// Returns `None` for missing, non-positive, or out-of-range values.
fn local_time_bound(seconds: Option<i64>) -> Option<DateTime<Local>> {
    let seconds = seconds.filter(|s| *s > 0)?;
    Local.timestamp_opt(seconds, 0).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_raw() -> RawFactorQuery {
        RawFactorQuery {
            db: Some("analytics".to_string()),
            tb: Some("factor.alpha".to_string()),
            start_time: Some(1_700_000_000),
            end_time: Some(1_700_003_600),
            cs: Some("factor-value".to_string()),
        }
    }

    #[test]
    fn test_validate_accepts_complete_request() {
        let request = validate(valid_raw()).unwrap();
        assert_eq!(request.database, "analytics");
        assert_eq!(request.table_name, "factor.alpha");
        assert_eq!(request.column_spec, "factor-value");
        assert_eq!(request.start_time.timestamp(), 1_700_000_000);
        assert_eq!(request.end_time.timestamp(), 1_700_003_600);
    }

    #[test]
    fn test_validate_missing_database() {
        let raw = RawFactorQuery {
            db: Some(String::new()),
            ..valid_raw()
        };
        assert_eq!(validate(raw), Err(ValidationError::MissingField("database")));
    }

    #[test]
    fn test_validate_missing_table() {
        let raw = RawFactorQuery {
            tb: Some(String::new()),
            ..valid_raw()
        };
        assert_eq!(validate(raw), Err(ValidationError::MissingField("table")));
    }

    #[test]
    fn test_validate_non_positive_start_time() {
        for start_time in [None, Some(0), Some(-5)] {
            let raw = RawFactorQuery {
                start_time,
                ..valid_raw()
            };
            assert_eq!(
                validate(raw),
                Err(ValidationError::InvalidField("start_time"))
            );
        }
    }

    #[test]
    fn test_validate_non_positive_end_time() {
        for end_time in [None, Some(0), Some(-1)] {
            let raw = RawFactorQuery {
                end_time,
                ..valid_raw()
            };
            assert_eq!(validate(raw), Err(ValidationError::InvalidField("end_time")));
        }
    }

    #[test]
    fn test_validate_unrepresentable_time_is_invalid() {
        let raw = RawFactorQuery {
            end_time: Some(i64::MAX),
            ..valid_raw()
        };
        assert_eq!(validate(raw), Err(ValidationError::InvalidField("end_time")));
    }

    #[test]
    fn test_validate_empty_columns() {
        let raw = RawFactorQuery {
            cs: Some(String::new()),
            ..valid_raw()
        };
        assert_eq!(validate(raw), Err(ValidationError::InvalidField("columns")));
    }

    #[test]
    fn test_validate_reports_first_failure() {
        // Everything is missing; the database check runs first.
        assert_eq!(
            validate(RawFactorQuery::default()),
            Err(ValidationError::MissingField("database"))
        );

        let raw = RawFactorQuery {
            start_time: Some(0),
            cs: Some(String::new()),
            ..valid_raw()
        };
        assert_eq!(
            validate(raw),
            Err(ValidationError::InvalidField("start_time"))
        );
    }

    #[test]
    fn test_validate_allows_reversed_range() {
        let raw = RawFactorQuery {
            start_time: Some(1_700_003_600),
            end_time: Some(1_700_000_000),
            ..valid_raw()
        };
        assert!(validate(raw).is_ok());
    }

    #[test]
    fn test_raw_query_defaults_missing_keys() {
        let raw: RawFactorQuery = serde_json::from_str(r#"{"db": "analytics"}"#).unwrap();
        assert_eq!(raw.db.as_deref(), Some("analytics"));
        assert_eq!(raw.tb, None);
        assert_eq!(raw.start_time, None);
        assert_eq!(raw.cs, None);
    }

    #[test]
    fn test_null_fields_read_as_absent() {
        let raw: RawFactorQuery = serde_json::from_str(
            r#"{"db": null, "tb": "t", "start_time": 1, "end_time": 1, "cs": "c"}"#,
        )
        .unwrap();
        assert_eq!(raw.db, None);
        assert_eq!(validate(raw), Err(ValidationError::MissingField("database")));

        let raw: RawFactorQuery = serde_json::from_str(
            r#"{"db": "a", "tb": "t", "start_time": 1, "end_time": 1, "cs": null}"#,
        )
        .unwrap();
        assert_eq!(validate(raw), Err(ValidationError::InvalidField("columns")));
    }

    #[test]
    fn test_raw_query_rejects_unknown_keys_and_bad_types() {
        assert!(serde_json::from_str::<RawFactorQuery>(r#"{"db": "a", "limit": 10}"#).is_err());
        assert!(serde_json::from_str::<RawFactorQuery>(r#"{"start_time": "yesterday"}"#).is_err());
    }

    #[test]
    fn test_validation_error_messages_name_field() {
        assert_eq!(
            ValidationError::MissingField("database").to_string(),
            "Database name is required"
        );
        assert_eq!(
            ValidationError::InvalidField("columns").to_string(),
            "Columns must be a non-empty list"
        );
        assert_eq!(ValidationError::InvalidField("end_time").field(), "end_time");
    }
}
