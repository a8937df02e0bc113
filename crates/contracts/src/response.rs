// SPDX-FileCopyrightText: © 2025 Lexibridge Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Outbound response shapes.

use lexibridge_core::Language;
use serde::Serialize;

/// Response body for both unary translate routes: `{"result": "..."}`.
#[derive(Debug, Clone, Serialize)]
pub struct TranslatedResult {
    pub result: String,
}

/// Response body for `POST /translator/batch`: `{"results": [...]}`, in the
/// same order as the request's `translations`.
#[derive(Debug, Clone, Serialize)]
pub struct BatchTranslatedResult {
    pub results: Vec<TranslatedResult>,
}

/// Response body for `GET /language`.
#[derive(Debug, Clone, Serialize)]
pub struct LanguageDetectionResult {
    pub language: Language,
    pub confidence: f64,
}

/// Response body for `GET /translator/tokens`.
#[derive(Debug, Clone, Serialize)]
pub struct TokenCountResult {
    pub length: usize,
}

/// Response body for `GET /health`, in the shields.io badge shape expected
/// by status-dashboard integrations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub schema_version: u8,
    pub label: String,
    pub message: String,
}

impl HealthResponse {
    #[must_use]
    pub fn online() -> Self {
        Self {
            schema_version: 1,
            label: "lexibridge".to_string(),
            message: "online".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_shape() {
        let health = HealthResponse::online();
        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["schemaVersion"], 1);
        assert_eq!(json["message"], "online");
    }

    #[test]
    fn test_batch_result_order_preserved_in_serialization() {
        let batch = BatchTranslatedResult {
            results: vec![
                TranslatedResult {
                    result: "uno".to_string(),
                },
                TranslatedResult {
                    result: "dos".to_string(),
                },
            ],
        };
        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(json["results"][0]["result"], "uno");
        assert_eq!(json["results"][1]["result"], "dos");
    }
}
