//! services/api/src/error.rs
//!
//! Defines the error types of the API service: `ApiError` for startup failures
//! and `HttpError`, the JSON error response every handler returns.

use crate::config::ConfigError;
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use health_report_core::{ErrorKind, PortError, ReportError};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

/// The primary error type for starting the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

//=========================================================================================
// HTTP Error Responses
//=========================================================================================

/// The body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub detail: String,
}

/// A status code plus a client-safe message, rendered as `{"detail": ...}`.
#[derive(Debug)]
pub struct HttpError {
    pub status: StatusCode,
    pub detail: String,
}

impl HttpError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn unprocessable(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, detail)
    }
}

impl From<ReportError> for HttpError {
    fn from(e: ReportError) -> Self {
        let status = match (&e, e.kind()) {
            (ReportError::InvalidUserId, _) => StatusCode::BAD_REQUEST,
            (_, ErrorKind::InvalidInput) => StatusCode::UNPROCESSABLE_ENTITY,
            (_, ErrorKind::NotFound) => StatusCode::NOT_FOUND,
            (ReportError::ProviderTimeout(_), _) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl From<PortError> for HttpError {
    fn from(e: PortError) -> Self {
        match e {
            PortError::NotFound(detail) => Self::new(StatusCode::NOT_FOUND, detail),
            PortError::Unexpected(detail) => {
                error!("Record store failure: {}", detail);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl From<QueryRejection> for HttpError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn report_errors_map_to_documented_statuses() {
        let cases = [
            (ReportError::InvalidUserId, StatusCode::BAD_REQUEST),
            (ReportError::InvalidDateRange, StatusCode::UNPROCESSABLE_ENTITY),
            (
                ReportError::InvalidDateFormat {
                    field: "end_date",
                    value: "x".to_string(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (ReportError::NoData, StatusCode::NOT_FOUND),
            (
                ReportError::Configuration("GROQ_API_KEY".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ReportError::Provider("boom".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ReportError::ProviderTimeout(Duration::from_secs(1)),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                ReportError::RenderingUnavailable,
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(HttpError::from(error).status, status);
        }
    }

    #[test]
    fn unexpected_port_errors_do_not_leak_detail() {
        let e = HttpError::from(PortError::Unexpected("relation \"symptoms\" does not exist".into()));
        assert_eq!(e.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.detail, "Internal server error");
    }
}
