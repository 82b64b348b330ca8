//! Outcome of a finished pty session.

use std::borrow::Cow;
use std::time::Duration;

/// Result of a session that ran to completion.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    /// The command line that was run.
    pub command: String,

    /// Output read up to and including the prompt.
    pub transcript: Vec<u8>,

    /// Bytes drained after the credential was sent.
    pub drained: u64,

    /// Child exit code.
    pub exit_code: u32,

    /// Time from spawn to the join of drain and exit.
    pub elapsed: Duration,
}

impl SessionOutcome {
    /// Check if the child exited cleanly.
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// The prompt transcript as text (lossy UTF-8).
    pub fn transcript_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.transcript)
    }
}

impl std::fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "'{}' exited {} after {:?} ({} bytes drained)",
            self.command, self.exit_code, self.elapsed, self.drained
        )
    }
}
