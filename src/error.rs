//! Error types for the HTTP adapter.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::crypto::CryptoError;

/// Failures surfaced by the HTTP adapter. Ledger operations themselves
/// cannot fail; these only abort the one request.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("edit target not found: serial {serial:?}, index {index}")]
    EditTargetNotFound { serial: String, index: usize },

    #[error("invalid input: {0}")]
    InvalidInput(#[from] JsonRejection),

    #[error("display sealing failed")]
    Crypto(#[from] CryptoError),

    #[error("internal server error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::EditTargetNotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::InvalidInput(rejection) => rejection.status(),
            ApiError::Crypto(_) | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
