//! Application error type and its HTTP rendering.
//!
//! Every failure the core can produce belongs to one [`ErrorKind`]. The request
//! layer turns [`AppError`] into a JSON body of the form
//! `{ "error": { "code", "message", "details" } }` with a status code per kind.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};

use crate::utils::url_validator::ValidationError;

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorInfo,
}

/// Serializable error payload shared by the error body and inline results.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub message: String,
    pub details: Value,
}

/// Failure taxonomy exposed by the shortening core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed, oversized or dangerous input. Fixable by the caller.
    InputError,
    /// Intentional refusal: private targets, unsupported schemes.
    SecurityRejection,
    /// Target did not answer the liveness probe. May succeed later.
    UnreachableTarget,
    /// No free identifier found within the attempt budget.
    IdentifierExhausted,
    /// The persistence collaborator failed or timed out.
    StorageFailure,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Validation { message: String, details: Value },
    #[error("{message}")]
    SecurityRejection { message: String, details: Value },
    #[error("{message}")]
    Unreachable { message: String, details: Value },
    #[error("{message}")]
    NotFound { message: String, details: Value },
    #[error("{message}")]
    RateLimited { message: String, details: Value },
    #[error("{message}")]
    PayloadTooLarge { message: String, details: Value },
    #[error("{message}")]
    UnsupportedMediaType { message: String, details: Value },
    #[error("{message}")]
    MethodNotAllowed { message: String, details: Value },
    #[error("{message}")]
    IdentifierExhausted { message: String, details: Value },
    #[error("{message}")]
    StorageTimeout { message: String, details: Value },
    #[error("{message}")]
    Internal { message: String, details: Value },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }
    pub fn security_rejection(message: impl Into<String>, details: Value) -> Self {
        Self::SecurityRejection {
            message: message.into(),
            details,
        }
    }
    pub fn unreachable(message: impl Into<String>, details: Value) -> Self {
        Self::Unreachable {
            message: message.into(),
            details,
        }
    }
    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }
    pub fn rate_limited(message: impl Into<String>, details: Value) -> Self {
        Self::RateLimited {
            message: message.into(),
            details,
        }
    }
    pub fn payload_too_large(message: impl Into<String>, details: Value) -> Self {
        Self::PayloadTooLarge {
            message: message.into(),
            details,
        }
    }
    pub fn unsupported_media_type(message: impl Into<String>, details: Value) -> Self {
        Self::UnsupportedMediaType {
            message: message.into(),
            details,
        }
    }
    pub fn method_not_allowed(message: impl Into<String>, details: Value) -> Self {
        Self::MethodNotAllowed {
            message: message.into(),
            details,
        }
    }
    pub fn identifier_exhausted(message: impl Into<String>, details: Value) -> Self {
        Self::IdentifierExhausted {
            message: message.into(),
            details,
        }
    }
    pub fn storage_timeout(message: impl Into<String>, details: Value) -> Self {
        Self::StorageTimeout {
            message: message.into(),
            details,
        }
    }
    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }

    /// Returns the taxonomy entry for errors produced by the core.
    ///
    /// Errors that only exist at the request layer (unknown routes, rate
    /// limits, body and method problems) have no kind.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            AppError::Validation { .. } => Some(ErrorKind::InputError),
            AppError::SecurityRejection { .. } => Some(ErrorKind::SecurityRejection),
            AppError::Unreachable { .. } => Some(ErrorKind::UnreachableTarget),
            AppError::IdentifierExhausted { .. } => Some(ErrorKind::IdentifierExhausted),
            AppError::StorageTimeout { .. } | AppError::Internal { .. } => {
                Some(ErrorKind::StorageFailure)
            }
            AppError::NotFound { .. }
            | AppError::RateLimited { .. }
            | AppError::PayloadTooLarge { .. }
            | AppError::UnsupportedMediaType { .. }
            | AppError::MethodNotAllowed { .. } => None,
        }
    }

    fn parts(&self) -> (StatusCode, &'static str, &String, &Value) {
        match self {
            AppError::Validation { message, details } => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                message,
                details,
            ),
            AppError::SecurityRejection { message, details } => (
                StatusCode::FORBIDDEN,
                "security_rejection",
                message,
                details,
            ),
            AppError::Unreachable { message, details } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "unreachable_target",
                message,
                details,
            ),
            AppError::NotFound { message, details } => {
                (StatusCode::NOT_FOUND, "not_found", message, details)
            }
            AppError::RateLimited { message, details } => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limit_exceeded",
                message,
                details,
            ),
            AppError::PayloadTooLarge { message, details } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                message,
                details,
            ),
            AppError::UnsupportedMediaType { message, details } => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "unsupported_media_type",
                message,
                details,
            ),
            AppError::MethodNotAllowed { message, details } => (
                StatusCode::METHOD_NOT_ALLOWED,
                "method_not_allowed",
                message,
                details,
            ),
            AppError::IdentifierExhausted { message, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "identifier_exhausted",
                message,
                details,
            ),
            AppError::StorageTimeout { message, details } => (
                StatusCode::GATEWAY_TIMEOUT,
                "storage_timeout",
                message,
                details,
            ),
            AppError::Internal { message, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                message,
                details,
            ),
        }
    }

    /// HTTP status the request layer answers with.
    pub fn status_code(&self) -> StatusCode {
        self.parts().0
    }

    pub fn to_error_info(&self) -> ErrorInfo {
        let (_, code, message, details) = self.parts();
        ErrorInfo {
            code,
            message: message.clone(),
            details: details.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.to_error_info(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        let details = json!({ "reason": err.reason() });
        let message = err.to_string();
        match err.kind() {
            ErrorKind::SecurityRejection => AppError::security_rejection(message, details),
            ErrorKind::UnreachableTarget => AppError::unreachable(message, details),
            _ => AppError::bad_request(message, details),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = serde_json::to_value(errors.field_errors()).unwrap_or_else(|_| json!({}));
        AppError::bad_request("Request validation failed", details)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let details = json!({ "reason": rejection.body_text() });
        match &rejection {
            JsonRejection::MissingJsonContentType(_) => AppError::unsupported_media_type(
                "Content-Type must be application/json",
                details,
            ),
            _ if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                AppError::payload_too_large("Request body too large", details)
            }
            _ => AppError::bad_request("Invalid JSON body", details),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!(error = %e, "Database error");
        AppError::internal("Database error", json!({}))
    }
}
