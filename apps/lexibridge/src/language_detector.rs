// SPDX-FileCopyrightText: © 2025 Lexibridge Contributors
//
// SPDX-License-Identifier: MPL-2.0

use async_trait::async_trait;
use lexibridge_core::{Error, Language, Result};

/// Detects the language of a piece of text, independent of translation.
/// Requires no serialization beyond whatever its own implementation
/// mandates; unlike the decoder, it is read-only and safe for concurrent
/// calls.
#[async_trait]
pub trait LanguageDetector: Send + Sync {
    async fn detect(
        &self,
        text: &str,
        fast_model_confidence_threshold: Option<f64>,
        accurate_model_confidence_threshold: Option<f64>,
    ) -> Result<(Language, f64)>;
}

/// A script-range heuristic detector: classifies by the dominant Unicode
/// script among the text's characters, then maps that script to a
/// representative FLORES-200 code. Confidence is the fraction of
/// classified characters belonging to the winning script. This trades
/// precision among languages sharing a script (e.g. `fra_Latn` vs.
/// `eng_Latn`) for zero model-download cost; callers who need finer
/// distinctions should supply their own repository-backed detector.
pub struct ScriptLanguageDetector;

impl ScriptLanguageDetector {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn classify_char(c: char) -> Option<&'static str> {
        match c {
            '\u{0400}'..='\u{04FF}' => Some("rus_Cyrl"),
            '\u{0370}'..='\u{03FF}' => Some("ell_Grek"),
            '\u{0600}'..='\u{06FF}' => Some("arb_Arab"),
            '\u{0590}'..='\u{05FF}' => Some("heb_Hebr"),
            '\u{3040}'..='\u{309F}' | '\u{30A0}'..='\u{30FF}' => Some("jpn_Jpan"),
            '\u{4E00}'..='\u{9FFF}' => Some("zho_Hans"),
            '\u{AC00}'..='\u{D7A3}' => Some("kor_Hang"),
            '\u{0900}'..='\u{097F}' => Some("hin_Deva"),
            'a'..='z' | 'A'..='Z' => Some("eng_Latn"),
            _ => None,
        }
    }
}

impl Default for ScriptLanguageDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LanguageDetector for ScriptLanguageDetector {
    async fn detect(
        &self,
        text: &str,
        _fast_model_confidence_threshold: Option<f64>,
        _accurate_model_confidence_threshold: Option<f64>,
    ) -> Result<(Language, f64)> {
        if text.is_empty() {
            return Err(Error::InvalidInput("text must not be empty".to_string()));
        }

        let mut counts: std::collections::HashMap<&'static str, usize> =
            std::collections::HashMap::new();
        let mut classified = 0usize;

        for c in text.chars() {
            if let Some(script) = Self::classify_char(c) {
                *counts.entry(script).or_insert(0) += 1;
                classified += 1;
            }
        }

        let Some((winner, count)) = counts.into_iter().max_by_key(|(_, count)| *count) else {
            return Ok((Language::default_source(), 0.0));
        };

        #[allow(clippy::cast_precision_loss)]
        let confidence = count as f64 / classified.max(1) as f64;

        let language = Language::parse(winner).unwrap_or_else(|_| Language::default_source());
        Ok((language, confidence))
    }
}

/// Always reports a fixed language and confidence. Used by tests and by
/// the `stub_language_detector` configuration flag.
pub struct StubLanguageDetector;

impl StubLanguageDetector {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for StubLanguageDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LanguageDetector for StubLanguageDetector {
    async fn detect(
        &self,
        text: &str,
        _fast_model_confidence_threshold: Option<f64>,
        _accurate_model_confidence_threshold: Option<f64>,
    ) -> Result<(Language, f64)> {
        if text.is_empty() {
            return Err(Error::InvalidInput("text must not be empty".to_string()));
        }
        Ok((Language::default_source(), 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_detector_rejects_empty_text() {
        let detector = ScriptLanguageDetector::new();
        assert!(matches!(
            detector.detect("", None, None).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_script_detector_detects_cyrillic() {
        let detector = ScriptLanguageDetector::new();
        let (language, confidence) = detector.detect("Привет мир", None, None).await.unwrap();
        assert_eq!(language.as_str(), "rus_Cyrl");
        assert!(confidence > 0.5);
    }

    #[tokio::test]
    async fn test_script_detector_detects_latin() {
        let detector = ScriptLanguageDetector::new();
        let (language, _confidence) = detector.detect("Hello world", None, None).await.unwrap();
        assert_eq!(language.as_str(), "eng_Latn");
    }

    #[tokio::test]
    async fn test_stub_detector_is_fixed_output() {
        let detector = StubLanguageDetector::new();
        let (language, confidence) = detector.detect("anything", None, None).await.unwrap();
        assert_eq!(language, Language::default_source());
        assert!((confidence - 1.0).abs() < f64::EPSILON);
    }
}
