//! Secure-copy transfers driven through a pty.

use std::io::Write;
use std::path::Path;

use log::info;
use secrecy::{ExposeSecret, SecretString};

use super::coordinator::SessionCoordinator;
use super::response::SessionOutcome;
use crate::channel::{LogSink, NativePty, PtyBackend};
use crate::compare::compare_trees;
use crate::error::{ConfigError, Result};
use crate::transport::{ScpConfig, TransferEndpoint};

/// A configured scp client.
///
/// Each transfer runs scp behind a fresh pty, answers its password prompt
/// and streams the remaining output to the log.
#[derive(Debug)]
pub struct SecureCopy {
    config: ScpConfig,
}

impl SecureCopy {
    /// Create a client from a finished configuration.
    pub fn new(config: ScpConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &ScpConfig {
        &self.config
    }

    /// Copy `src` to `dest`.
    pub async fn copy(
        &self,
        src: &TransferEndpoint,
        dest: &TransferEndpoint,
    ) -> Result<SessionOutcome> {
        let backend = NativePty::new(self.config.pty.clone());
        self.copy_with(backend, src, dest, LogSink::new("scp")).await
    }

    /// Copy `src` to `dest` over the given backend, draining output to `sink`.
    pub async fn copy_with<B, S>(
        &self,
        backend: B,
        src: &TransferEndpoint,
        dest: &TransferEndpoint,
        sink: S,
    ) -> Result<SessionOutcome>
    where
        B: PtyBackend,
        S: Write + Send + 'static,
    {
        let command = self.config.command(src, dest);
        info!("> {}", command.display());

        let secret = SecretString::from(self.config.password.expose_secret().to_owned());
        let mut session = SessionCoordinator::new(backend, self.config.session.clone());
        session.run(&command, secret, sink).await
    }

    /// Push `source_dir` into `host:remote_dir`, pull it back into
    /// `target_dir` and require the two trees to match.
    pub async fn round_trip(
        &self,
        source_dir: &Path,
        host: &str,
        remote_dir: &str,
        target_dir: &Path,
    ) -> Result<()> {
        let name = source_dir
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ConfigError::Invalid {
                message: format!("source has no usable name: {}", source_dir.display()),
            })?;

        self.copy(
            &TransferEndpoint::local(source_dir),
            &TransferEndpoint::remote(host, remote_dir),
        )
        .await?;

        let remote_copy = format!("{}/{}", remote_dir.trim_end_matches('/'), name);
        self.copy(
            &TransferEndpoint::remote(host, remote_copy),
            &TransferEndpoint::local(target_dir),
        )
        .await?;

        let pulled = target_dir.join(name);
        compare_trees(source_dir, &pulled)?;
        info!(
            "round trip of {} through {}:{} verified",
            source_dir.display(),
            host,
            remote_dir
        );
        Ok(())
    }
}
