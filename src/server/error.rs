//! Error types for the REST API server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::clickhouse::ExecutionError;
use crate::embedded::EmbeddedError;
use crate::request::ValidationError;
use crate::response::ShapeError;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    /// Request body is not a JSON object of the expected shape
    InvalidBody(String),
    /// A field failed validation
    Validation(ValidationError),
    /// The remote store failed to run the query
    Execution(ExecutionError),
    /// The result set did not match the query plan
    Shape(ShapeError),
    /// The embedded engine failed
    Embedded(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::InvalidBody(msg) => write!(f, "Invalid request body: {}", msg),
            ApiError::Validation(err) => write!(f, "{}", err),
            ApiError::Execution(err) => write!(f, "Query execution failed: {}", err),
            ApiError::Shape(err) => write!(f, "Unexpected result shape: {}", err),
            ApiError::Embedded(msg) => write!(f, "Embedded engine error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// HTTP status the error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidBody(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Execution(_) | ApiError::Shape(_) | ApiError::Embedded(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (error_type, message) = match &self {
            ApiError::InvalidBody(msg) => ("InvalidBody", msg.clone()),
            ApiError::Validation(ValidationError::MissingField(_)) => {
                ("MissingField", self.to_string())
            }
            ApiError::Validation(ValidationError::InvalidField(_)) => {
                ("InvalidField", self.to_string())
            }
            ApiError::Execution(err) => ("ExecutionError", err.to_string()),
            ApiError::Shape(err) => ("ShapeError", err.to_string()),
            ApiError::Embedded(msg) => ("EmbeddedError", msg.clone()),
        };

        let body = Json(json!({
            "error": error_type,
            "message": message,
        }));

        (status, body).into_response()
    }
}

// Conversions from other error types

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}

impl From<ExecutionError> for ApiError {
    fn from(err: ExecutionError) -> Self {
        ApiError::Execution(err)
    }
}

impl From<ShapeError> for ApiError {
    fn from(err: ShapeError) -> Self {
        ApiError::Shape(err)
    }
}

impl From<EmbeddedError> for ApiError {
    fn from(err: EmbeddedError) -> Self {
        ApiError::Embedded(err.to_string())
    }
}
