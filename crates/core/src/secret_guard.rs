// SPDX-FileCopyrightText: © 2025 Lexibridge Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Constant-time bearer token comparison for lifecycle endpoints.
//!
//! Lifecycle operations (model load/unload, cache eviction) are guarded by
//! a shared secret supplied via the `Authorization` header. Unlike a plain
//! `!=` comparison, [`token_matches`] runs in time independent of where the
//! first differing byte falls, so a timing side channel can't be used to
//! recover the configured token one byte at a time.

/// Returns `true` if `presented` equals `expected`, comparing in constant
/// time with respect to the byte contents (length is still observable,
/// which is unavoidable without padding to a fixed size and not considered
/// sensitive here).
#[must_use]
pub fn token_matches(expected: &str, presented: &str) -> bool {
    let expected = expected.as_bytes();
    let presented = presented.as_bytes();

    if expected.len() != presented.len() {
        return false;
    }

    let mut diff: u8 = 0;
    for (a, b) in expected.iter().zip(presented.iter()) {
        diff |= a ^ b;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_tokens() {
        assert!(token_matches("s3cr3t", "s3cr3t"));
    }

    #[test]
    fn test_mismatched_tokens_same_length() {
        assert!(!token_matches("s3cr3t", "s3cr3x"));
    }

    #[test]
    fn test_mismatched_length() {
        assert!(!token_matches("s3cr3t", "s3cr3"));
        assert!(!token_matches("s3cr3t", "s3cr3txx"));
    }

    #[test]
    fn test_empty_strings() {
        assert!(token_matches("", ""));
    }

    #[test]
    fn test_empty_vs_nonempty() {
        assert!(!token_matches("", "s3cr3t"));
        assert!(!token_matches("s3cr3t", ""));
    }
}
