//! API error type and its JSON rendering

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use leadflow_domain::LeadflowError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Error returned by the authenticated API handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    /// Logged in full, reported to the caller as a generic message.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<LeadflowError> for ApiError {
    fn from(err: LeadflowError) -> Self {
        match err {
            LeadflowError::InvalidInput(msg) => Self::BadRequest(msg),
            LeadflowError::Auth(msg) => Self::Unauthorized(msg),
            LeadflowError::NotFound(msg) => Self::NotFound(format!("Not found: {msg}")),
            LeadflowError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::Internal(detail) => {
                error!(error = %detail, "request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases = [
            (LeadflowError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (LeadflowError::Auth("x".into()), StatusCode::UNAUTHORIZED),
            (LeadflowError::NotFound("lead".into()), StatusCode::NOT_FOUND),
            (LeadflowError::Conflict("x".into()), StatusCode::CONFLICT),
            (LeadflowError::Database("locked".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status_code(), expected);
        }
    }

    #[test]
    fn internal_detail_is_not_rendered() {
        let response = ApiError::Internal("disk I/O error".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
