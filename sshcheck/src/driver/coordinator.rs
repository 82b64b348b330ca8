//! Session coordinator: prompt, credential, drain, exit.
//!
//! Once the credential is written, the remaining pty output is copied to a
//! sink on one blocking worker while another waits for the child to exit.
//! Both must finish before the session is reported. Waiting for exit first
//! would deadlock a child that blocks writing into a full pty buffer, and
//! stopping at exit would drop output still queued on the master.

use std::fmt;
use std::io::{self, Write};
use std::time::{Duration, Instant};

use log::{debug, warn};
use secrecy::SecretString;
use tokio::task::JoinHandle;
use tokio::time::{timeout, timeout_at};

use super::injector::inject_on_prompt;
use super::response::SessionOutcome;
use crate::channel::{
    ChildHandle, CommandSpec, DEFAULT_PROMPT_LIMIT, ProcessKiller, PromptPattern, PtyBackend,
    PtyHandles,
};
use crate::error::{ChannelError, Result, SessionError};

/// Lifecycle of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing started yet.
    Idle,
    /// Child launched behind the pty.
    Started,
    /// Scanning output for the prompt.
    AwaitingPrompt,
    /// Credential written.
    CredentialSent,
    /// Draining output and waiting for exit.
    Draining,
    /// Child exited cleanly and all output was collected.
    Finished,
    /// Terminal failure.
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Configuration for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Prompt to answer.
    pub prompt: PromptPattern,

    /// Deadline for the whole session, from spawn to exit.
    pub timeout: Duration,

    /// Maximum output buffered while waiting for the prompt.
    pub prompt_limit: usize,

    /// How long to wait for a killed child to be reaped.
    pub reap_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            prompt: PromptPattern::default(),
            timeout: Duration::from_secs(60),
            prompt_limit: DEFAULT_PROMPT_LIMIT,
            reap_grace: Duration::from_secs(5),
        }
    }
}

/// Runs one child through a pty session and owns every resource it uses.
///
/// The master is released exactly once whatever the outcome, and a child
/// that is still running when the coordinator gives up (or is dropped) is
/// killed.
pub struct SessionCoordinator<B: PtyBackend> {
    backend: B,
    config: SessionConfig,
    state: SessionState,
    writer: Option<Box<dyn Write + Send>>,
    killer: Option<Box<dyn ProcessKiller>>,
}

impl<B: PtyBackend> SessionCoordinator<B> {
    /// Create a coordinator over an unopened backend.
    pub fn new(backend: B, config: SessionConfig) -> Self {
        Self {
            backend,
            config,
            state: SessionState::Idle,
            writer: None,
            killer: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Get the configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Get a reference to the backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run `command`, answer its prompt with `secret` and collect the rest of
    /// its output into `sink`.
    ///
    /// # Errors
    ///
    /// - [`PtyError`](crate::error::PtyError) if the pty cannot be opened or
    ///   the child cannot be started
    /// - [`ChannelError::PromptNotFound`] if the child closes its output
    ///   before prompting
    /// - [`ChannelError::Transport`] on master read/write failure
    /// - [`SessionError::Timeout`] if the deadline passes; the child is killed
    /// - [`SessionError::ExitStatus`] if the child exits non-zero
    pub async fn run<S>(
        &mut self,
        command: &CommandSpec,
        secret: SecretString,
        sink: S,
    ) -> Result<SessionOutcome>
    where
        S: Write + Send + 'static,
    {
        if self.state != SessionState::Idle {
            return Err(SessionError::AlreadyStarted.into());
        }

        let result = self.drive(command, secret, sink).await;

        match result {
            Ok(ref outcome) => {
                self.transition(SessionState::Finished);
                debug!("{}", outcome);
            }
            Err(ref e) => {
                self.transition(SessionState::Failed);
                debug!("session for '{}' failed: {}", command.display(), e);
            }
        }
        self.release();
        result
    }

    async fn drive<S>(
        &mut self,
        command: &CommandSpec,
        secret: SecretString,
        mut sink: S,
    ) -> Result<SessionOutcome>
    where
        S: Write + Send + 'static,
    {
        let start = Instant::now();
        let deadline = tokio::time::Instant::now() + self.config.timeout;

        self.backend.open()?;
        self.backend.attach(command)?;
        let PtyHandles {
            mut reader,
            mut writer,
            mut child,
        } = self.backend.start()?;
        self.killer = Some(child.killer());
        self.transition(SessionState::Started);

        // Prompt phase: the only reader of the master until it returns.
        self.transition(SessionState::AwaitingPrompt);
        let prompt = self.config.prompt.clone();
        let limit = self.config.prompt_limit;
        let mut injection = tokio::task::spawn_blocking(move || {
            let result = inject_on_prompt(&mut reader, &mut writer, &prompt, &secret, limit);
            (reader, writer, result)
        });

        let (reader, writer, injected) = match timeout_at(deadline, &mut injection).await {
            Ok(Ok(parts)) => parts,
            Ok(Err(e)) => {
                self.terminate(child).await;
                return Err(SessionError::Task(e.to_string()).into());
            }
            Err(_) => {
                debug!("no prompt within {:?}", self.config.timeout);
                self.terminate(child).await;
                return Err(SessionError::Timeout(self.config.timeout).into());
            }
        };
        self.writer = Some(writer);

        let transcript = match injected {
            Ok(transcript) => transcript,
            Err(e) => {
                self.terminate(child).await;
                return Err(e.into());
            }
        };
        self.transition(SessionState::CredentialSent);

        // Drain phase: the drain task now owns the reader.
        let mut reader = reader;
        let mut drain = tokio::task::spawn_blocking(move || -> io::Result<u64> {
            let copied = io::copy(&mut reader, &mut sink)?;
            sink.flush()?;
            Ok(copied)
        });
        let mut wait = tokio::task::spawn_blocking(move || child.wait());
        self.transition(SessionState::Draining);

        let joined = timeout_at(deadline, async { tokio::join!(&mut drain, &mut wait) }).await;
        let (drained, status) = match joined {
            Ok(pair) => pair,
            Err(_) => {
                debug!("session exceeded {:?} while draining", self.config.timeout);
                self.kill();
                self.reap(&mut wait).await;
                // The drain ends by itself once the slave hangs up.
                return Err(SessionError::Timeout(self.config.timeout).into());
            }
        };

        let exit_code = status
            .map_err(|e| SessionError::Task(e.to_string()))?
            .map_err(SessionError::Wait)?;
        self.killer = None;

        let drained = drained
            .map_err(|e| SessionError::Task(e.to_string()))?
            .map_err(ChannelError::Transport)?;

        if exit_code != 0 {
            return Err(SessionError::ExitStatus { code: exit_code }.into());
        }

        Ok(SessionOutcome {
            command: command.display(),
            transcript,
            drained,
            exit_code,
            elapsed: start.elapsed(),
        })
    }

    fn transition(&mut self, next: SessionState) {
        debug!("session state: {} -> {}", self.state, next);
        self.state = next;
    }

    fn kill(&mut self) {
        if let Some(killer) = self.killer.as_mut() {
            let _ = killer.kill();
        }
    }

    /// Kill the child and reap it within the grace period.
    async fn terminate(&mut self, child: Box<dyn ChildHandle>) {
        self.kill();
        let mut child = child;
        let mut wait = tokio::task::spawn_blocking(move || child.wait());
        self.reap(&mut wait).await;
    }

    /// Wait out the grace period after a hangup, then SIGKILL the child's
    /// process group and wait once more.
    async fn reap(&mut self, wait: &mut JoinHandle<io::Result<u32>>) {
        if self.await_exit(wait).await {
            return;
        }
        warn!(
            "child ignored hangup for {:?}, killing its process group",
            self.config.reap_grace
        );
        self.force_kill();
        if !self.await_exit(wait).await {
            warn!("child still running {:?} after SIGKILL", self.config.reap_grace);
        }
    }

    /// Returns false only if the child is still running after the grace period.
    async fn await_exit(&mut self, wait: &mut JoinHandle<io::Result<u32>>) -> bool {
        match timeout(self.config.reap_grace, &mut *wait).await {
            Ok(Ok(Ok(code))) => {
                debug!("child reaped with status {}", code);
                self.killer = None;
                true
            }
            Ok(Ok(Err(e))) => {
                warn!("failed to reap child: {}", e);
                true
            }
            Ok(Err(e)) => {
                warn!("reaper task failed: {}", e);
                true
            }
            Err(_) => false,
        }
    }

    fn force_kill(&mut self) {
        if let Some(killer) = self.killer.as_mut() {
            let _ = killer.force_kill();
        }
    }

    /// Release the master and stop a child nobody is waiting for.
    fn release(&mut self) {
        self.force_kill();
        self.killer = None;
        self.writer = None;
        self.backend.close();
    }
}

impl<B: PtyBackend> Drop for SessionCoordinator<B> {
    fn drop(&mut self) {
        self.release();
    }
}
