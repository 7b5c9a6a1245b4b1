//! API error types.
//!
//! Service failures keep their machine-readable code in the body; the HTTP
//! status follows the failure class.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pgvault_service::ServiceError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::middleware::RequestId;

/// API error type.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed path, query or body
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Failure reported by the configuration service
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Service(e) => match e {
                ServiceError::IllegalState { .. } | ServiceError::Validation { .. } => {
                    StatusCode::BAD_REQUEST
                }
                ServiceError::AccessDenied { .. } => StatusCode::FORBIDDEN,
                ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
                ServiceError::Conflict { .. } => StatusCode::CONFLICT,
                ServiceError::UnsupportedProvider { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                ServiceError::Crypto { .. }
                | ServiceError::Storage { .. }
                | ServiceError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Returns the error code string.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Service(e) => e.code(),
        }
    }

    fn public_message(&self) -> String {
        if self.status_code().is_server_error() {
            "Internal server error".to_string()
        } else {
            match self {
                Self::Service(e) => e.to_string(),
                other => other.to_string(),
            }
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error status
    pub status: &'static str,
    /// Error code
    pub code: &'static str,
    /// Error message
    pub message: String,
    /// Request ID (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let request_id = RequestId::current().map(|id| id.to_string());
        if status.is_server_error() {
            error!(
                code = self.error_code(),
                error = %self,
                request_id = ?request_id,
                "Request failed"
            );
        }
        let body = ErrorResponse {
            status: "error",
            code: self.error_code(),
            message: self.public_message(),
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pgvault_core::types::PgProvider;
    use pgvault_service::ConflictKind;

    #[test]
    fn test_service_error_status_codes() {
        let cases = [
            (ServiceError::IllegalState { reason: "no tenant".into() }, StatusCode::BAD_REQUEST),
            (ServiceError::AccessDenied { reason: "foreign".into() }, StatusCode::FORBIDDEN),
            (ServiceError::configuration_not_found("x"), StatusCode::NOT_FOUND),
            (
                ServiceError::conflict(ConflictKind::AlreadyActive, "taken"),
                StatusCode::CONFLICT,
            ),
            (
                ServiceError::validation("reason", "too short"),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::UnsupportedProvider {
                    provider: PgProvider::Kakao,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (ServiceError::Crypto { reason: "tag".into() }, StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status_code(), status);
        }
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ApiError::BadRequest("x".to_string()).error_code(), "BAD_REQUEST");
        assert_eq!(
            ApiError::from(ServiceError::AccessDenied { reason: "x".into() }).error_code(),
            "ACCESS_DENIED"
        );
    }

    #[test]
    fn test_server_errors_hide_detail() {
        let error = ApiError::from(ServiceError::Storage {
            reason: "disk path /var/lib/pgvault".into(),
        });
        assert_eq!(error.public_message(), "Internal server error");

        let error = ApiError::from(ServiceError::AccessDenied { reason: "foreign tenant".into() });
        assert!(error.public_message().contains("foreign tenant"));
    }
}
