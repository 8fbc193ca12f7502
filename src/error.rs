// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use std::fmt;

use crate::{sandbox::SandboxError, store::StoreError};

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 400 Bad Request with per-field details
    Validation(Value),

    // 400 Bad Request
    UnsupportedLanguage(String),

    // 401 Unauthorized
    AuthError(String),

    // 403 Forbidden
    Forbidden(String),

    // 403 Forbidden, device lock held by another session
    TestLocked,

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (one attempt per test, duplicate username, ...)
    Conflict(String),

    // 409 Conflict, resource still referenced elsewhere
    InUse(String),

    // 500, sandbox unreachable or returned garbage
    Execution(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl AppError {
    /// Stable machine-readable code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InternalServerError(_) => "INTERNAL_ERROR",
            AppError::BadRequest(_) | AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::UnsupportedLanguage(_) => "UNSUPPORTED_LANGUAGE",
            AppError::AuthError(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::TestLocked => "TEST_LOCKED_ANOTHER_DEVICE",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "ALREADY_EXISTS",
            AppError::InUse(_) => "CONFLICT",
            AppError::Execution(_) => "EXECUTION_ERROR",
            AppError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InternalServerError(_) | AppError::Execution(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::BadRequest(_)
            | AppError::Validation(_)
            | AppError::UnsupportedLanguage(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) | AppError::TestLocked => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::InUse(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Renders `{ success: false, error: { code, message, details? } }`.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let (message, details) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                ("Internal Server Error".to_string(), None)
            }
            AppError::Execution(msg) => {
                tracing::error!("Execution failure: {}", msg);
                ("Failed to execute code".to_string(), None)
            }
            AppError::ServiceUnavailable(msg) => {
                tracing::warn!("Dependency unavailable: {}", msg);
                ("Code execution service is unavailable".to_string(), None)
            }
            AppError::Validation(details) => ("Invalid request".to_string(), Some(details)),
            AppError::TestLocked => (
                "You have an active test session on another device. \
                 Please complete or submit the test to continue."
                    .to_string(),
                None,
            ),
            AppError::BadRequest(msg)
            | AppError::UnsupportedLanguage(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::InUse(msg) => (msg, None),
        };

        let mut error = json!({ "code": code, "message": message });
        if let Some(details) = details {
            error["details"] = details;
        }

        let body = Json(json!({
            "success": false,
            "error": error,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errs: validator::ValidationErrors) -> Self {
        let details = serde_json::to_value(errs.field_errors())
            .unwrap_or_else(|_| Value::String(errs.to_string()));
        AppError::Validation(details)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(what) => AppError::Conflict(what),
            StoreError::Corrupt(msg) => AppError::InternalServerError(msg),
            StoreError::Database(e) => AppError::InternalServerError(e.to_string()),
        }
    }
}

impl From<SandboxError> for AppError {
    fn from(err: SandboxError) -> Self {
        AppError::Execution(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_conflicts_map_to_expected_codes() {
        assert_eq!(AppError::TestLocked.code(), "TEST_LOCKED_ANOTHER_DEVICE");
        assert_eq!(AppError::TestLocked.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::Conflict("x".into()).code(), "ALREADY_EXISTS");
        assert_eq!(AppError::InUse("x".into()).code(), "CONFLICT");
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn sandbox_failures_are_execution_errors() {
        let err: AppError = SandboxError::Unreachable("connection refused".into()).into();
        assert_eq!(err.code(), "EXECUTION_ERROR");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err: AppError = SandboxError::Malformed("not json".into()).into();
        assert_eq!(err.code(), "EXECUTION_ERROR");
    }
}
