//! Builder for secure-copy sessions.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use indexmap::IndexMap;
use secrecy::SecretString;

use super::coordinator::SessionConfig;
use super::transfer::SecureCopy;
use crate::channel::{PromptPattern, PtyConfig};
use crate::error::{ConfigError, Error, Result};
use crate::transport::{HostKeyVerification, ScpConfig, ToolPaths, locate_program};

/// Builder for constructing a [`SecureCopy`].
///
/// # Example
///
/// ```rust,no_run
/// use sshcheck::driver::ScpBuilder;
/// use sshcheck::transport::TransferEndpoint;
///
/// # async fn example() -> Result<(), sshcheck::Error> {
/// let scp = ScpBuilder::new("cf:6f1f7c3b-3b5e-4c3a-9d7e-2b8f0e1a4c55/0")
///     .port(2222)
///     .password("bearer eyJhbGciOi...")
///     .build()?;
///
/// scp.copy(
///     &TransferEndpoint::local("/tmp/scp-source"),
///     &TransferEndpoint::remote("ssh.example.com", "/home/vcap"),
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
pub struct ScpBuilder {
    user: String,
    port: u16,
    password: Option<SecretString>,
    program: Option<PathBuf>,
    recursive: bool,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    env: IndexMap<OsString, OsString>,
    session: SessionConfig,
    pty: PtyConfig,
}

impl ScpBuilder {
    /// Create a new builder logging in as `user`.
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            port: 22,
            password: None,
            program: None,
            recursive: true,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
            env: IndexMap::new(),
            session: SessionConfig::default(),
            pty: PtyConfig::default(),
        }
    }

    /// Set the SSH port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Replace the login user.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Set the password answered at the prompt.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::from(password.into()));
        self
    }

    /// Use this scp executable instead of searching `PATH`.
    pub fn program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = Some(program.into());
        self
    }

    /// Use the scp executable from an earlier [`ToolPaths::discover`].
    pub fn tools(self, tools: &ToolPaths) -> Self {
        self.program(tools.scp.clone())
    }

    /// Copy directories recursively (default: true).
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Set host key verification (default: disabled).
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    /// Set the known_hosts file.
    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// Add an environment variable for the scp process.
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the prompt to answer (default: `"password: "`).
    pub fn prompt(mut self, prompt: PromptPattern) -> Self {
        self.session.prompt = prompt;
        self
    }

    /// Set the deadline for each transfer.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.session.timeout = timeout;
        self
    }

    /// Cap the output buffered while waiting for the prompt.
    pub fn prompt_limit(mut self, limit: usize) -> Self {
        self.session.prompt_limit = limit;
        self
    }

    /// Set terminal dimensions.
    pub fn terminal_size(mut self, width: u16, height: u16) -> Self {
        self.pty.terminal_width = width;
        self.pty.terminal_height = height;
        self
    }

    /// Build the secure-copy client.
    ///
    /// Resolves `scp` from `PATH` unless a program was given.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] if the user or password is missing, the
    /// timeout is zero, or the prompt limit cannot hold the prompt.
    pub fn build(self) -> Result<SecureCopy> {
        if self.user.is_empty() {
            return Err(invalid("user is required"));
        }

        let password = self
            .password
            .ok_or_else(|| invalid("password is required"))?;

        if self.session.timeout.is_zero() {
            return Err(invalid("timeout must be greater than zero"));
        }

        let prompt_len = self.session.prompt.len();
        if self.session.prompt_limit < prompt_len {
            return Err(invalid(format!(
                "prompt limit {} cannot hold a {}-byte prompt",
                self.session.prompt_limit, prompt_len
            )));
        }

        let program = match self.program {
            Some(program) => program,
            None => locate_program("scp")?,
        };

        Ok(SecureCopy::new(ScpConfig {
            program,
            port: self.port,
            user: self.user,
            password,
            recursive: self.recursive,
            host_key_verification: self.host_key_verification,
            known_hosts_path: self.known_hosts_path,
            env: self.env,
            session: self.session,
            pty: self.pty,
        }))
    }
}

fn invalid(message: impl Into<String>) -> Error {
    ConfigError::Invalid {
        message: message.into(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_build_with_explicit_program() {
        let scp = ScpBuilder::new("cf:guid/0")
            .port(2222)
            .password("bearer abc")
            .program("/opt/bin/scp")
            .timeout(Duration::from_secs(5))
            .terminal_size(80, 24)
            .build()
            .unwrap();

        let config = scp.config();
        assert_eq!(config.program, PathBuf::from("/opt/bin/scp"));
        assert_eq!(config.port, 2222);
        assert_eq!(config.user, "cf:guid/0");
        assert_eq!(config.password.expose_secret(), "bearer abc");
        assert_eq!(config.session.timeout, Duration::from_secs(5));
        assert_eq!(config.pty.terminal_width, 80);
        assert!(config.recursive);
    }

    #[test]
    fn test_password_required() {
        let err = ScpBuilder::new("cf:guid/0")
            .program("/opt/bin/scp")
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_user_required() {
        let err = ScpBuilder::new("cf:guid/0")
            .user("")
            .password("x")
            .program("/opt/bin/scp")
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_custom_prompt() {
        let scp = ScpBuilder::new("u")
            .password("x")
            .program("/opt/bin/scp")
            .prompt(PromptPattern::new("Passphrase> ").unwrap())
            .prompt_limit(1024)
            .build()
            .unwrap();

        assert_eq!(scp.config().session.prompt.as_bytes(), b"Passphrase> ");
        assert_eq!(scp.config().session.prompt_limit, 1024);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = ScpBuilder::new("u")
            .password("x")
            .program("/opt/bin/scp")
            .timeout(Duration::ZERO)
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_prompt_limit_must_hold_prompt() {
        for limit in [0, 9] {
            let err = ScpBuilder::new("u")
                .password("x")
                .program("/opt/bin/scp")
                .prompt_limit(limit)
                .build()
                .err()
                .unwrap();
            assert!(
                matches!(err, Error::Config(ConfigError::Invalid { .. })),
                "limit {limit} accepted"
            );
        }

        // Exactly the length of "password: ".
        let scp = ScpBuilder::new("u")
            .password("x")
            .program("/opt/bin/scp")
            .prompt_limit(10)
            .build()
            .unwrap();
        assert_eq!(scp.config().session.prompt_limit, 10);
    }

    #[test]
    fn test_program_from_discovered_tools() {
        let tools = ToolPaths {
            scp: PathBuf::from("/usr/local/bin/scp"),
            sftp: PathBuf::from("/usr/local/bin/sftp"),
        };
        let scp = ScpBuilder::new("u")
            .password("x")
            .tools(&tools)
            .build()
            .unwrap();
        assert_eq!(scp.config().program, tools.scp);
    }
}
