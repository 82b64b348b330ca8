//! Error types for sshcheck.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for sshcheck operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Pseudo-terminal allocation and process spawn errors
    #[error("PTY error: {0}")]
    Pty(#[from] PtyError),

    /// Prompt detection and master-side I/O errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Session lifecycle errors (timeouts, exit status)
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Transfer verification errors
    #[error("Compare error: {0}")]
    Compare(#[from] CompareError),

    /// Platform CLI errors
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Whether this error is a session deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Session(SessionError::Timeout(_)))
    }

    /// Whether the child closed its output without ever prompting.
    pub fn is_prompt_not_found(&self) -> bool {
        matches!(self, Error::Channel(ChannelError::PromptNotFound { .. }))
    }
}

/// PTY layer errors (allocation, attach, spawn).
#[derive(Error, Debug)]
pub enum PtyError {
    /// The OS could not allocate a pseudo-terminal pair
    #[error("Failed to allocate PTY: {0}")]
    OpenFailed(String),

    /// `attach` or `start` was called before `open`
    #[error("PTY not open - call open() first")]
    NotOpen,

    /// `start` was called before `attach`
    #[error("No command attached to PTY")]
    NotAttached,

    /// The child process could not be spawned on the slave side
    #[error("Failed to spawn '{program}': {message}")]
    SpawnFailed { program: String, message: String },

    /// The master side could not be split into reader and writer
    #[error("Failed to acquire PTY master handle: {0}")]
    MasterUnavailable(String),
}

/// Channel layer errors (prompt matching, master I/O).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The master reached end-of-stream before the prompt appeared
    #[error("Prompt {pattern:?} not found before end of output ({bytes_read} bytes read)")]
    PromptNotFound { pattern: String, bytes_read: usize },

    /// Too much output arrived without a prompt
    #[error("Prompt buffer exceeded {limit} bytes without a match")]
    PromptBufferExceeded { limit: usize },

    /// Prompt patterns must contain at least one byte
    #[error("Prompt pattern is empty")]
    EmptyPattern,

    /// Read or write failure on the PTY master
    #[error("PTY transport error: {0}")]
    Transport(#[from] io::Error),
}

/// Session lifecycle errors.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The session deadline elapsed; the child was terminated
    #[error("Session timed out after {0:?}")]
    Timeout(Duration),

    /// The child exited unsuccessfully
    #[error("Process exited with status {code}")]
    ExitStatus { code: u32 },

    /// Waiting on the child failed
    #[error("Failed to wait for child: {0}")]
    Wait(#[source] io::Error),

    /// A blocking worker panicked or was cancelled
    #[error("Session worker failed: {0}")]
    Task(String),

    /// A coordinator runs exactly one session
    #[error("Session already started")]
    AlreadyStarted,
}

/// Tree comparison errors.
#[derive(Error, Debug)]
pub enum CompareError {
    /// The trees diverge
    #[error(transparent)]
    Mismatch(#[from] MismatchError),

    /// A path could not be inspected
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// First divergence found between two directory trees.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Trees differ at '{}': {kind}", path.display())]
pub struct MismatchError {
    /// Path relative to the compared roots (empty for the roots themselves).
    pub path: PathBuf,

    /// What differs.
    pub kind: MismatchKind,
}

/// Category of a tree divergence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MismatchKind {
    #[error("entry count {left} != {right}")]
    EntryCount { left: usize, right: usize },

    #[error("entry name {left:?} != {right:?}")]
    Name { left: String, right: String },

    #[error("one side is a directory, the other is not")]
    Kind,

    #[error("mode {left:o} != {right:o}")]
    Mode { left: u32, right: u32 },

    #[error("size {left} != {right}")]
    Size { left: u64, right: u64 },

    #[error("content differs at byte {offset}")]
    Content { offset: u64 },
}

/// Platform CLI errors.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// The CLI could not be launched
    #[error("Failed to run '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The CLI exited non-zero
    #[error("'{command}' exited with {code:?}: {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// No bearer token in `oauth-token` output
    #[error("No bearer token in CLI output")]
    TokenNotFound,

    /// `app --guid` printed nothing
    #[error("Empty GUID for app '{app}'")]
    EmptyGuid { app: String },

    /// The info document could not be decoded
    #[error("Invalid info response: {0}")]
    InvalidInfo(#[from] serde_json::Error),

    /// The SSH endpoint is not `host:port`
    #[error("Invalid SSH endpoint '{0}'")]
    InvalidEndpoint(String),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required environment variable is unset
    #[error("Environment variable {0} is not set")]
    MissingEnv(&'static str),

    /// Config file could not be read
    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Config file is not valid JSON for the expected schema
    #[error("Failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Executable not found on PATH
    #[error("Program '{0}' not found on PATH")]
    ProgramNotFound(String),

    /// Builder or config value is invalid
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    /// Transfer fixture could not be created
    #[error("Failed to create fixture: {0}")]
    Fixture(#[source] io::Error),
}

/// Result type alias using sshcheck's Error.
pub type Result<T> = std::result::Result<T, Error>;
