//! Error taxonomy for the HTTP surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::event::MissingFindingsUrl;
use crate::provider::ProviderError;

/// Body returned to clients for JSON errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Everything a handler can fail with.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed body or missing required field
    #[error("{0}")]
    BadRequest(String),

    /// Webhook signature or timestamp rejected
    #[error("Invalid webhook")]
    AuthFailure,

    /// A call to another service failed
    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    UpstreamTimeout(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            // Nightfall's reference receiver answers 500 here; kept for parity.
            AppError::AuthFailure => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            AppError::AuthFailure => (status, self.to_string()).into_response(),
            _ => (status, Json(ErrorResponse { error: self.to_string() })).into_response(),
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Io { .. } => AppError::BadRequest(err.to_string()),
            ProviderError::Http(ref e) if e.is_timeout() => AppError::UpstreamTimeout(err.to_string()),
            _ => AppError::Upstream(err.to_string()),
        }
    }
}

impl From<MissingFindingsUrl> for AppError {
    fn from(err: MissingFindingsUrl) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
