// SPDX-FileCopyrightText: © 2025 Lexibridge Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Lexibridge Contracts - request/response shapes and boundary validation
//! for the translation HTTP surface.
//!
//! Validation lives here rather than in the HTTP layer so that the engine
//! crate and any future non-HTTP binding (a gRPC facade, a batch CLI tool)
//! share the exact same boundary rules.

pub mod request;
pub mod response;
pub mod validate;

pub use request::{BatchTranslationRequest, TranslationRequest};
pub use response::{
    BatchTranslatedResult, HealthResponse, LanguageDetectionResult, TokenCountResult,
    TranslatedResult,
};
