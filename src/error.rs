use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::schema::{FieldErrors, SchemaError};

#[derive(Debug)]
pub enum AppError {
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    BadRequest(String),
    /// Schema or payload failed validation. `fields` maps field names to messages.
    Validation(String, FieldErrors),
    PreconditionFailed(String),
    Conflict(String),
    RateLimited(String),
    Internal(String),
    Database(sqlx::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into(), FieldErrors::new())
    }

    /// Stable failure kind reported to callers alongside the message.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => "unauthenticated",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::Validation(..) => "validation_error",
            AppError::PreconditionFailed(_) => "precondition_failed",
            AppError::Conflict(_) => "conflict",
            AppError::RateLimited(_) => "rate_limited",
            AppError::Internal(_) => "internal",
            AppError::Database(_) => "store_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(..) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
            AppError::NotFound(msg) => write!(f, "Not Found: {msg}"),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {msg}"),
            AppError::Validation(msg, _) => write!(f, "Validation Error: {msg}"),
            AppError::PreconditionFailed(msg) => write!(f, "Precondition Failed: {msg}"),
            AppError::Conflict(msg) => write!(f, "Conflict: {msg}"),
            AppError::RateLimited(msg) => write!(f, "Rate Limited: {msg}"),
            AppError::Internal(msg) => write!(f, "Internal Error: {msg}"),
            AppError::Database(err) => write!(f, "Database Error: {err}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();

        let body = match self {
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                json!({ "error": "Internal server error", "kind": kind })
            }
            AppError::Database(err) => {
                tracing::error!("Database error: {err}");
                json!({ "error": "Internal server error", "kind": kind })
            }
            AppError::Validation(msg, fields) if !fields.is_empty() => {
                json!({ "error": msg, "kind": kind, "fields": fields })
            }
            AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::Validation(msg, _)
            | AppError::PreconditionFailed(msg)
            | AppError::Conflict(msg)
            | AppError::RateLimited(msg) => json!({ "error": msg, "kind": kind }),
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err)
    }
}

/// Well-formed JSON of the wrong shape is a validation failure; anything the
/// extractor could not even parse is a bad request.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => AppError::validation(err.body_text()),
            other => AppError::BadRequest(other.body_text()),
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<SchemaError> for AppError {
    fn from(err: SchemaError) -> Self {
        let mut fields = FieldErrors::new();
        if let Some(name) = err.field_name() {
            fields.insert(name.to_string(), err.to_string());
        }
        AppError::Validation(format!("Invalid form schema: {err}"), fields)
    }
}

impl From<FieldErrors> for AppError {
    fn from(fields: FieldErrors) -> Self {
        AppError::Validation("Entry data does not match the form schema".to_string(), fields)
    }
}
