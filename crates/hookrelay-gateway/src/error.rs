// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP error mapping.
//!
//! Every error leaves the gateway as `{"error": "<message>"}` with a status
//! code chosen by [`ApiError::status`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hookrelay_core::RelayError;
use hookrelay_pipeline::IngestError;
use serde::Serialize;
use thiserror::Error;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    /// Missing, malformed, or unknown session token.
    #[error("authentication required")]
    Unauthenticated,

    /// The caller lacks the membership or role the operation needs.
    #[error("forbidden")]
    Forbidden,

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Ingest(err) => match err {
                IngestError::MissingToken
                | IngestError::BadCredentialFormat
                | IngestError::InvalidPayload(_)
                | IngestError::InvalidEventId(_)
                | IngestError::NoDestinations => StatusCode::BAD_REQUEST,
                IngestError::Unauthorized | IngestError::AmbiguousCredential { .. } => {
                    StatusCode::FORBIDDEN
                }
                IngestError::LedgerWriteConflict { .. } | IngestError::Storage(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Relay(err) => match err {
                RelayError::Validation(_) => StatusCode::BAD_REQUEST,
                RelayError::NotFound { .. } => StatusCode::NOT_FOUND,
                RelayError::Conflict { .. } => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
