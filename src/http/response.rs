//! Error responses.
//!
//! # Design Decisions
//! - Every error body is `{"error": "<message>"}`
//! - An open breaker is 503; downstream timeouts are 504
//! - A downstream 404 passes through; other downstream statuses are 502

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::bulk::BulkError;
use crate::client::ClientError;

/// Errors surfaced by inbound handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    /// Body could not be read or parsed; keeps the extractor's status
    /// (400, 413, 415, 422).
    #[error("{}", .0.body_text())]
    Payload(#[from] JsonRejection),

    #[error(transparent)]
    Downstream(#[from] ClientError),

    #[error(transparent)]
    Bulk(#[from] BulkError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Payload(rejection) => rejection.status(),
            ApiError::Downstream(e) => match e {
                ClientError::CircuitOpen(_) | ClientError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
                ClientError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                ClientError::UnexpectedStatus { status: 404, .. } => StatusCode::NOT_FOUND,
                ClientError::InvalidUrl(_) | ClientError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_GATEWAY,
            },
            ApiError::Bulk(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
