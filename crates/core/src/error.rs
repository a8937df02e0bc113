// SPDX-FileCopyrightText: © 2025 Lexibridge Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Structured error types for Lexibridge.
//!
//! This module provides the error kinds surfaced across the translation
//! core and its HTTP binding. All variants implement `Display` and convert
//! to/from `String` for ergonomic propagation from lower layers.

use thiserror::Error;

/// Main error type for Lexibridge operations.
///
/// Each variant maps to one of the documented error kinds and its HTTP
/// status code is decided at the response boundary, not here — this type
/// stays transport-agnostic.
#[derive(Debug, Error)]
pub enum Error {
    /// Validation failure: empty text, an out-of-range parameter, or an
    /// unrecognized language code.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Bearer token mismatch on a lifecycle endpoint.
    #[error("unauthorized")]
    Unauthorized,

    /// The asset resolver could not locate or download the requested model.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// A translate call arrived while the model is not in the `LOADED` state.
    #[error("model unavailable")]
    ModelUnavailable,

    /// The decoder produced no tokens for a batch item.
    #[error("decode produced no tokens")]
    DecodeEmpty,

    /// The per-request deadline elapsed before completion.
    #[error("request timed out")]
    Timeout,

    /// Any other failure. The message is for logs only — never forwarded to
    /// a client verbatim (see the HTTP error mapping).
    #[error("internal error: {0}")]
    Internal(String),

    /// I/O error (cache directory access, model file reads).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for Results using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}

// Backward-compatible fallback conversions: a bare string defaults to an
// internal error rather than panicking the caller into picking a variant.
impl From<String> for Error {
    fn from(s: String) -> Self {
        Self::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Self::Internal(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("text must not be empty".to_string());
        assert_eq!(err.to_string(), "invalid input: text must not be empty");

        let err = Error::ModelUnavailable;
        assert_eq!(err.to_string(), "model unavailable");
    }

    #[test]
    fn test_error_to_string_conversion() {
        let err = Error::Internal("decoder panicked".to_string());
        let s: String = err.into();
        assert_eq!(s, "internal error: decoder panicked");
    }

    #[test]
    fn test_string_to_error_conversion() {
        let err: Error = "something went wrong".into();
        assert_eq!(err.to_string(), "internal error: something went wrong");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("I/O error"));
        assert!(err.to_string().contains("file not found"));
    }
}
