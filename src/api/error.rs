//! Error-to-response mapping for the JSON API.

use crate::aws::error::OpsError;
use crate::provision::LaunchError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Request failure surfaced to the HTTP client.
///
/// Backend messages are passed through verbatim; every error is terminal for
/// the request.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Ops(#[from] OpsError),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Ops(OpsError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Ops(OpsError::Conflict { .. }) => StatusCode::CONFLICT,
            Self::Ops(OpsError::Unavailable { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Launch(err) => match err.source {
                OpsError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::BAD_REQUEST,
            },
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            // A failed launch names the reusable resources it left behind,
            // so an operator is not surprised by them later.
            Self::Launch(err) => serde_json::json!({
                "error": self.to_string(),
                "established": err.established,
            }),
            _ => serde_json::json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
