//! Channel layer for pty sessions and prompt detection.
//!
//! This module owns everything that touches the pty master directly:
//! allocating the pty, matching the password prompt and collecting
//! whatever the child prints afterwards.

mod buffer;
mod patterns;
mod pty;
#[cfg(test)]
pub(crate) mod scripted;
pub(crate) mod signal;
mod sink;

pub use buffer::{DEFAULT_PROMPT_LIMIT, PromptBuffer};
pub use patterns::{DEFAULT_PASSWORD_PROMPT, PromptMatcher, PromptPattern, matches};
pub use pty::{
    ChildHandle, CommandSpec, NativePty, ProcessKiller, PtyBackend, PtyConfig, PtyHandles,
};
pub use sink::{LogSink, SharedBuffer};
