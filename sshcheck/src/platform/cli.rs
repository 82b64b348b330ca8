//! Thin wrapper around the platform CLI.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;

use indexmap::IndexMap;
use log::{debug, info};
use regex::Regex;
use secrecy::ExposeSecret;
use tokio::process::Command;

use super::info::{SshEndpoint, parse_info};
use crate::config::HarnessConfig;
use crate::error::PlatformError;

/// Event recorded when an SSH session into an app is authorized.
pub const SSH_AUTHORIZED_EVENT: &str = "audit.app.ssh-authorized";

/// Log line the SSH proxy emits for an accepted session.
pub const REMOTE_ACCESS_LOG: &str = "Successful remote access";

static BEARER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"bearer [^ \t\r\n]+").expect("bearer token pattern"));

/// Captured output of one CLI invocation.
#[derive(Debug, Clone, Default)]
pub struct CliOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs platform CLI commands (`cf` by default).
#[derive(Debug, Clone)]
pub struct CfCli {
    program: PathBuf,
    env: IndexMap<OsString, OsString>,
}

impl Default for CfCli {
    fn default() -> Self {
        Self::new("cf")
    }
}

impl CfCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            env: IndexMap::new(),
        }
    }

    /// Set an environment variable for every invocation (e.g. `CF_HOME`).
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run the CLI with `args` and capture its output.
    pub async fn run(&self, args: &[&str]) -> Result<CliOutput, PlatformError> {
        self.exec(args, args.join(" ")).await
    }

    async fn exec(&self, args: &[&str], shown: String) -> Result<CliOutput, PlatformError> {
        let command = format!("{} {}", self.program.display(), shown);
        info!("> {}", command);

        let output = Command::new(&self.program)
            .args(args)
            .envs(&self.env)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| PlatformError::Launch {
                program: self.program.display().to_string(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(PlatformError::CommandFailed {
                command,
                code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        debug!("'{}' wrote {} bytes", command, stdout.len());
        Ok(CliOutput { stdout, stderr })
    }

    /// Target the API and authenticate with the configured admin user.
    pub async fn login(&self, config: &HarnessConfig) -> Result<(), PlatformError> {
        let mut api = vec!["api", config.api.as_str()];
        if config.skip_ssl_validation {
            api.push("--skip-ssl-validation");
        }
        self.run(&api).await?;

        let password = config.admin_password.expose_secret();
        self.exec(
            &["auth", config.admin_user.as_str(), password],
            format!("auth {} [REDACTED]", config.admin_user),
        )
        .await?;
        Ok(())
    }

    /// Fetch a fresh `bearer ...` token.
    pub async fn oauth_token(&self) -> Result<String, PlatformError> {
        let output = self.run(&["oauth-token"]).await?;
        parse_oauth_token(&output.stdout)
    }

    /// Look up the GUID of an app.
    pub async fn app_guid(&self, app: &str) -> Result<String, PlatformError> {
        let output = self.run(&["app", app, "--guid"]).await?;
        let guid = output.stdout.trim();
        if guid.is_empty() {
            return Err(PlatformError::EmptyGuid {
                app: app.to_string(),
            });
        }
        Ok(guid.to_string())
    }

    /// Discover the SSH gateway from `/v2/info`.
    pub async fn ssh_endpoint(&self) -> Result<SshEndpoint, PlatformError> {
        let output = self.run(&["curl", "/v2/info"]).await?;
        parse_info(&output.stdout)
    }

    /// Recent audit events for an app.
    pub async fn events(&self, app: &str) -> Result<String, PlatformError> {
        let output = self.run(&["events", app]).await?;
        Ok(output.stdout)
    }

    /// Buffered log lines for an app.
    pub async fn recent_logs(&self, app: &str) -> Result<String, PlatformError> {
        let output = self.run(&["logs", app, "--recent"]).await?;
        Ok(output.stdout)
    }

    /// Turn on SSH access for an app.
    pub async fn enable_ssh(&self, guid: &str) -> Result<(), PlatformError> {
        let path = format!("/v2/apps/{}", guid);
        self.run(&[
            "curl",
            path.as_str(),
            "-X",
            "PUT",
            "-d",
            r#"{"diego": true, "enable_ssh": true}"#,
        ])
        .await?;
        Ok(())
    }
}

/// Login user for instance `index` of an app.
pub fn ssh_user(guid: &str, index: u32) -> String {
    format!("cf:{}/{}", guid, index)
}

/// Pull the `bearer ...` token out of `oauth-token` output.
pub fn parse_oauth_token(output: &str) -> Result<String, PlatformError> {
    BEARER_TOKEN
        .find(output)
        .map(|m| m.as_str().to_string())
        .ok_or(PlatformError::TokenNotFound)
}
