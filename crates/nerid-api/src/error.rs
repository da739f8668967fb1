//! API error handling
//!
//! Author: hephaex@gmail.com

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use nerid_core::NeridError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    /// Well-formed request carrying unusable token data
    Unprocessable { code: &'static str, message: String },
    ClassifierUnavailable(String),
    ClassifierFailed(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ApiError::bad_request(msg)),
            AppError::Unprocessable { code, message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ApiError::new(code, message),
            ),
            AppError::ClassifierUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiError::new("CLASSIFIER_UNAVAILABLE", "Entity model is unavailable")
                    .with_details(msg),
            ),
            AppError::ClassifierFailed(msg) => (
                StatusCode::BAD_GATEWAY,
                ApiError::new("CLASSIFIER_ERROR", "Entity model request failed").with_details(msg),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::internal_error().with_details(msg),
            ),
        };

        (status, Json(error)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<NeridError> for AppError {
    fn from(err: NeridError) -> Self {
        match err {
            NeridError::ValidationError(msg) => AppError::BadRequest(msg),
            e @ NeridError::InvalidTokenSequence { .. } => AppError::Unprocessable {
                code: "INVALID_TOKENS",
                message: e.to_string(),
            },
            e @ NeridError::OffsetOutOfRange { .. } => AppError::Unprocessable {
                code: "INVALID_TOKENS",
                message: e.to_string(),
            },
            e @ NeridError::UnknownLabel(_) => AppError::Unprocessable {
                code: "UNKNOWN_LABEL",
                message: e.to_string(),
            },
            NeridError::ClassifierUnavailable(msg) => AppError::ClassifierUnavailable(msg),
            NeridError::ClassifierError(msg) => AppError::ClassifierFailed(msg),
            NeridError::ConfigError(msg) => {
                AppError::Internal(format!("Configuration error: {msg}"))
            }
            NeridError::Other(err) => AppError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                NeridError::ValidationError("empty".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                NeridError::UnknownLabel("X".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                NeridError::ClassifierUnavailable("loading".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                NeridError::ClassifierError("500".into()),
                StatusCode::BAD_GATEWAY,
            ),
        ];

        for (err, status) in cases {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }
}
