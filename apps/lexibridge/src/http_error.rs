// SPDX-FileCopyrightText: © 2025 Lexibridge Contributors
//
// SPDX-License-Identifier: MPL-2.0

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lexibridge_core::Error;
use serde::Serialize;
use tracing::error;

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

/// Wraps [`lexibridge_core::Error`] for the HTTP boundary. Non-validation
/// internals are downgraded to a fixed generic message so decoder paths,
/// cache paths, and tokenizer internals never reach a client; validation
/// and authorization messages are surfaced verbatim since they are built
/// from non-secret, already-validated request data.
pub struct AppError(pub Error);

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match self.0 {
            Error::InvalidInput(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            Error::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "unauthorized".to_string())
            },
            Error::ModelNotFound(msg) => {
                error!(error = %msg, "Model not found");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            },
            Error::ModelUnavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, "model unavailable".to_string())
            },
            Error::DecodeEmpty => {
                error!("Decoder produced no tokens for a batch item");
                (StatusCode::INTERNAL_SERVER_ERROR, "decode produced no output".to_string())
            },
            Error::Timeout => (StatusCode::GATEWAY_TIMEOUT, "request timed out".to_string()),
            Error::Internal(msg) => {
                error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            },
            Error::Io(e) => {
                error!(error = %e, "I/O error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            },
        };

        (status, Json(ErrorBody { detail })).into_response()
    }
}
