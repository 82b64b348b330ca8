//! Growing prompt buffer with an explicit upper bound.
//!
//! Output read while waiting for a prompt is appended one byte at a time and
//! the prompt suffix is checked after every byte. Nothing is discarded before
//! the match, so a prompt delivered in pieces is still found. Growth is capped
//! so a program that streams output instead of prompting fails fast instead of
//! buffering until the session deadline.

use bytes::BytesMut;

use super::patterns::PromptMatcher;
use crate::error::ChannelError;

/// Default cap on bytes buffered while waiting for a prompt (64 KiB).
pub const DEFAULT_PROMPT_LIMIT: usize = 64 * 1024;

/// Buffer for accumulating pre-prompt output and checking for the prompt.
#[derive(Debug)]
pub struct PromptBuffer {
    /// Everything read so far.
    buffer: BytesMut,

    /// Maximum number of bytes accepted before giving up.
    limit: usize,
}

impl PromptBuffer {
    /// Create a new prompt buffer that accepts at most `limit` bytes.
    pub fn new(limit: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(limit.min(1024)),
            limit,
        }
    }

    /// Append one byte and report whether the buffer now ends in the prompt.
    pub fn push<M: PromptMatcher + ?Sized>(
        &mut self,
        byte: u8,
        matcher: &M,
    ) -> Result<bool, ChannelError> {
        if self.buffer.len() >= self.limit {
            return Err(ChannelError::PromptBufferExceeded { limit: self.limit });
        }
        self.buffer.extend_from_slice(&[byte]);
        Ok(matcher.is_match(&self.buffer))
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> Vec<u8> {
        self.buffer.split().to_vec()
    }

    /// Get a reference to the buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Get the byte limit.
    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl Default for PromptBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_PROMPT_LIMIT)
    }
}
