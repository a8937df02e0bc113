// SPDX-FileCopyrightText: © 2025 Lexibridge Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Boundary validation shared by every entry point that accepts a
//! [`crate::TranslationRequest`] or batch thereof.

use lexibridge_core::{Error, Result};

/// Cap for the GET unary translate route, chosen to survive common URL
/// length limits.
pub const GET_TEXT_MAX_LEN: usize = 2000;

/// Cap for POST unary translate and every batch item.
pub const POST_TEXT_MAX_LEN: usize = 4096;

/// Validates request text length against the supplied cap. Empty text is
/// always rejected regardless of the cap.
pub fn validate_text_len(text: &str, max_len: usize) -> Result<()> {
    let len = text.chars().count();
    if len == 0 {
        return Err(Error::InvalidInput("text must not be empty".to_string()));
    }
    if len > max_len {
        return Err(Error::InvalidInput(format!(
            "text length {len} exceeds maximum of {max_len} characters"
        )));
    }
    Ok(())
}

/// Validates `min_length_percentage` is within the closed interval `[0.0, 1.0]`.
pub fn validate_min_length_percentage(value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(Error::InvalidInput(format!(
            "min_length_percentage {value} must be between 0.0 and 1.0"
        )));
    }
    Ok(())
}

/// Validates a batch has between 1 and `max_size` items inclusive.
pub fn validate_batch_size(len: usize, max_size: usize) -> Result<()> {
    if len == 0 {
        return Err(Error::InvalidInput(
            "batch must contain at least one item".to_string(),
        ));
    }
    if len > max_size {
        return Err(Error::InvalidInput(format!(
            "batch size {len} exceeds maximum of {max_size} items"
        )));
    }
    Ok(())
}

/// Validates a confidence threshold query parameter is within `[0.0, 1.0]`.
pub fn validate_confidence_threshold(value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(Error::InvalidInput(format!(
            "confidence threshold {value} must be between 0.0 and 1.0"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_len_boundaries() {
        assert!(validate_text_len("", POST_TEXT_MAX_LEN).is_err());
        assert!(validate_text_len("a", POST_TEXT_MAX_LEN).is_ok());
        let max = "a".repeat(POST_TEXT_MAX_LEN);
        assert!(validate_text_len(&max, POST_TEXT_MAX_LEN).is_ok());
        let over = "a".repeat(POST_TEXT_MAX_LEN + 1);
        assert!(validate_text_len(&over, POST_TEXT_MAX_LEN).is_err());
    }

    #[test]
    fn test_get_cap_is_smaller() {
        let text = "a".repeat(2001);
        assert!(validate_text_len(&text, GET_TEXT_MAX_LEN).is_err());
        assert!(validate_text_len(&text, POST_TEXT_MAX_LEN).is_ok());
    }

    #[test]
    fn test_min_length_percentage_boundaries() {
        assert!(validate_min_length_percentage(0.0).is_ok());
        assert!(validate_min_length_percentage(1.0).is_ok());
        assert!(validate_min_length_percentage(-0.01).is_err());
        assert!(validate_min_length_percentage(1.01).is_err());
    }

    #[test]
    fn test_batch_size_boundaries() {
        assert!(validate_batch_size(0, 128).is_err());
        assert!(validate_batch_size(1, 128).is_ok());
        assert!(validate_batch_size(128, 128).is_ok());
        assert!(validate_batch_size(129, 128).is_err());
    }
}
