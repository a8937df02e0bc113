// SPDX-FileCopyrightText: © 2025 Lexibridge Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Inbound request shapes.

use lexibridge_core::{Error, Language, Result};
use serde::Deserialize;

use crate::validate::{validate_batch_size, validate_min_length_percentage, validate_text_len};

fn default_min_length_percentage() -> f64 {
    0.8
}

fn default_source() -> Language {
    Language::default_source()
}

fn default_target() -> Language {
    Language::default_target()
}

/// A single translation request, shared by the unary (GET/POST) and batch
/// routes. Field defaults match the external interface table: source
/// defaults to `eng_Latn`, target to `spa_Latn`, `min_length_percentage` to
/// `0.8`.
#[derive(Debug, Clone, Deserialize)]
pub struct TranslationRequest {
    pub text: String,
    #[serde(default = "default_source")]
    pub source: Language,
    #[serde(default = "default_target")]
    pub target: Language,
    #[serde(default = "default_min_length_percentage")]
    pub min_length_percentage: f64,
}

impl TranslationRequest {
    /// Validates this request against a caller-supplied text length cap
    /// (2000 for the GET route, 4096 everywhere else).
    pub fn validate(&self, max_text_len: usize) -> Result<()> {
        validate_text_len(&self.text, max_text_len)?;
        validate_min_length_percentage(self.min_length_percentage)?;
        Ok(())
    }
}

/// Body of `POST /translator/batch`: an ordered list of
/// [`TranslationRequest`] items, each validated and translated
/// independently, with results returned in the same order.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchTranslationRequest {
    pub translations: Vec<TranslationRequest>,
}

impl BatchTranslationRequest {
    /// Validates batch cardinality and every item's fields.
    pub fn validate(&self, max_batch_size: usize, max_text_len: usize) -> Result<()> {
        validate_batch_size(self.translations.len(), max_batch_size)?;
        for item in &self.translations {
            item.validate(max_text_len)?;
        }
        Ok(())
    }
}

/// Query parameters for `GET /language`.
#[derive(Debug, Clone, Deserialize)]
pub struct LanguageDetectionQuery {
    pub text: String,
    pub fast_model_confidence_threshold: Option<f64>,
    pub accurate_model_confidence_threshold: Option<f64>,
}

impl LanguageDetectionQuery {
    pub fn validate(&self) -> Result<()> {
        if self.text.is_empty() {
            return Err(Error::InvalidInput("text must not be empty".to_string()));
        }
        for threshold in [
            self.fast_model_confidence_threshold,
            self.accurate_model_confidence_threshold,
        ]
        .into_iter()
        .flatten()
        {
            crate::validate::validate_confidence_threshold(threshold)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_with_defaults() {
        let req: TranslationRequest = serde_json::from_str(r#"{"text":"hello"}"#).unwrap();
        assert_eq!(req.text, "hello");
        assert_eq!(req.source.as_str(), "eng_Latn");
        assert_eq!(req.target.as_str(), "spa_Latn");
        assert!((req.min_length_percentage - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_deserialize_rejects_unknown_language() {
        let result: std::result::Result<TranslationRequest, _> =
            serde_json::from_str(r#"{"text":"hello","source":"xx_Yyyy"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_batch_validate_preserves_independent_failures() {
        let batch = BatchTranslationRequest {
            translations: vec![
                TranslationRequest {
                    text: "ok".to_string(),
                    source: Language::default_source(),
                    target: Language::default_target(),
                    min_length_percentage: 0.8,
                },
                TranslationRequest {
                    text: String::new(),
                    source: Language::default_source(),
                    target: Language::default_target(),
                    min_length_percentage: 0.8,
                },
            ],
        };
        assert!(batch.validate(128, 4096).is_err());
    }
}
