//! API error handling.
//!
//! Every failure a handler or pipeline stage can report maps to one variant
//! here. Client-caused errors carry their message verbatim; internal errors
//! only reveal their cause outside production.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::config::RunMode;
use crate::validation::ValidationError;

/// Message returned by the contact and logo handlers when something
/// unexpected fails while processing a valid submission.
pub const GENERIC_FAILURE: &str = "An error occurred. Please try again later.";

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    ServiceUnavailable(String),

    /// Unexpected failure inside a handler that has its own client message.
    #[error("{public}")]
    Handler { public: &'static str, cause: String },

    /// Unexpected failure that reached the terminal error stage.
    #[error("Internal server error")]
    Internal { cause: String, run_mode: RunMode },
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Handler { .. } | ApiError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn internal(cause: impl Into<String>, run_mode: RunMode) -> Self {
        ApiError::Internal {
            cause: cause.into(),
            run_mode,
        }
    }

    fn body(&self) -> ErrorResponse {
        match self {
            ApiError::Internal { cause, run_mode } => ErrorResponse {
                error: self.to_string(),
                message: Some(if run_mode.is_production() {
                    "Something went wrong".to_string()
                } else {
                    cause.clone()
                }),
            },
            _ => ErrorResponse {
                error: self.to_string(),
                message: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Handler { cause, .. } | ApiError::Internal { cause, .. } => {
                tracing::error!(error = %cause, "Request failed");
            }
            ApiError::Validation(_) => {}
            other => tracing::debug!(error = %other, "Request rejected"),
        }

        (self.status(), Json(self.body())).into_response()
    }
}
