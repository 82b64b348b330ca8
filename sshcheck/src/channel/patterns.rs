//! Literal prompt patterns and suffix matching.

use std::fmt;

use bytes::Bytes;

use crate::error::ChannelError;

/// Prompt written by OpenSSH clients when asking for a password.
pub const DEFAULT_PASSWORD_PROMPT: &[u8] = b"password: ";

/// Returns true iff `buffer` ends with `pattern`.
///
/// Byte-exact and case-sensitive. Callers append one byte at a time and
/// re-check, so a prompt split across several reads is still detected.
pub fn matches(buffer: &[u8], pattern: &[u8]) -> bool {
    buffer.ends_with(pattern)
}

/// Trait for prompt matching against an accumulated output buffer.
pub trait PromptMatcher: Send + Sync {
    /// Check whether the buffer currently ends in a prompt.
    fn is_match(&self, buffer: &[u8]) -> bool;
}

/// An immutable, non-empty literal prompt.
#[derive(Clone, PartialEq, Eq)]
pub struct PromptPattern(Bytes);

impl PromptPattern {
    /// Create a prompt pattern from a byte literal.
    pub fn new(pattern: impl Into<Bytes>) -> Result<Self, ChannelError> {
        let pattern = pattern.into();
        if pattern.is_empty() {
            return Err(ChannelError::EmptyPattern);
        }
        Ok(Self(pattern))
    }

    /// The raw prompt bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Prompt length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; empty patterns are rejected by [`PromptPattern::new`].
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PromptMatcher for PromptPattern {
    fn is_match(&self, buffer: &[u8]) -> bool {
        matches(buffer, &self.0)
    }
}

impl Default for PromptPattern {
    fn default() -> Self {
        Self(Bytes::from_static(DEFAULT_PASSWORD_PROMPT))
    }
}

impl fmt::Debug for PromptPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PromptPattern({:?})", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Display for PromptPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_match() {
        assert!(matches(b"user@host's password: ", b"password: "));
        assert!(matches(b"password: ", b"password: "));
        assert!(!matches(b"password:", b"password: "));
        assert!(!matches(b"password: \r\n", b"password: "));
    }

    #[test]
    fn test_match_is_case_sensitive() {
        assert!(!matches(b"Password: ", b"password: "));
        assert!(matches(b"Password: ", b"assword: "));
    }

    #[test]
    fn test_shorter_buffer_never_matches() {
        assert!(!matches(b"", b"password: "));
        assert!(!matches(b"word: ", b"password: "));
    }

    #[test]
    fn test_incremental_agrees_with_one_shot() {
        let inputs: [&[u8]; 5] = [
            b"Warning: Permanently added host\r\npassword: ",
            b"password: password",
            b"pass word: ",
            b"xxpassword: ",
            b"",
        ];
        let pattern = b"password: ";

        for input in inputs {
            let mut buffer = Vec::new();
            let mut last = false;
            for &byte in input {
                buffer.push(byte);
                last = matches(&buffer, pattern);
            }
            assert_eq!(last, matches(input, pattern), "input {:?}", input);
        }
    }

    #[test]
    fn test_incremental_sees_first_occurrence() {
        let input = b"password: trailing output";
        let pattern = b"password: ";

        let mut buffer = Vec::new();
        let mut first = None;
        for (i, &byte) in input.iter().enumerate() {
            buffer.push(byte);
            if first.is_none() && matches(&buffer, pattern) {
                first = Some(i + 1);
            }
        }
        assert_eq!(first, Some(pattern.len()));
    }

    #[test]
    fn test_empty_pattern_rejected() {
        assert!(matches!(
            PromptPattern::new(Bytes::new()),
            Err(ChannelError::EmptyPattern)
        ));
    }

    #[test]
    fn test_default_pattern() {
        let pattern = PromptPattern::default();
        assert_eq!(pattern.as_bytes(), b"password: ");
        assert!(pattern.is_match(b"cf:abc/0@ssh.example.com's password: "));
        assert_eq!(pattern.to_string(), "password: ");
    }
}
