//! Secure-copy invocation configuration.

use std::env;
use std::ffi::{OsStr, OsString};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use secrecy::SecretString;

use super::endpoint::TransferEndpoint;
use crate::channel::{CommandSpec, PtyConfig};
use crate::driver::SessionConfig;
use crate::error::ConfigError;

/// Host key verification mode, passed as `StrictHostKeyChecking`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HostKeyVerification {
    /// Reject unknown and changed keys.
    Strict,

    /// Accept and remember unknown keys, reject changed keys.
    AcceptNew,

    /// Accept all keys without checking. Known hosts default to `/dev/null`.
    #[default]
    Disabled,
}

impl HostKeyVerification {
    /// Value for `-oStrictHostKeyChecking=`.
    pub fn option_value(&self) -> &'static str {
        match self {
            Self::Strict => "yes",
            Self::AcceptNew => "accept-new",
            Self::Disabled => "no",
        }
    }
}

/// Secure-copy configuration.
#[derive(Debug)]
pub struct ScpConfig {
    /// Path of the scp executable.
    pub program: PathBuf,

    /// SSH gateway port.
    pub port: u16,

    /// Login user (e.g. `cf:<app-guid>/<index>`).
    pub user: String,

    /// Password answered at the prompt.
    pub password: SecretString,

    /// Copy directories recursively.
    pub recursive: bool,

    /// Host key verification mode.
    pub host_key_verification: HostKeyVerification,

    /// Path to known_hosts file.
    pub known_hosts_path: Option<PathBuf>,

    /// Extra environment for the scp process.
    pub env: IndexMap<OsString, OsString>,

    /// Prompt, deadline and buffer limits for each transfer.
    pub session: SessionConfig,

    /// Terminal size of the pty.
    pub pty: PtyConfig,
}

impl ScpConfig {
    /// Build the scp command line for one transfer.
    pub fn command(&self, src: &TransferEndpoint, dest: &TransferEndpoint) -> CommandSpec {
        let mut cmd = CommandSpec::new(&self.program);
        if self.recursive {
            cmd = cmd.arg("-r");
        }
        cmd = cmd
            .arg("-P")
            .arg(self.port.to_string())
            .arg(format!("-oUser={}", self.user));

        let known_hosts = match (&self.known_hosts_path, &self.host_key_verification) {
            (Some(path), _) => Some(path.as_os_str().to_owned()),
            (None, HostKeyVerification::Disabled) => Some(OsString::from("/dev/null")),
            (None, _) => None,
        };
        if let Some(path) = known_hosts {
            let mut option = OsString::from("-oUserKnownHostsFile=");
            option.push(path);
            cmd = cmd.arg(option);
        }

        cmd = cmd
            .arg(format!(
                "-oStrictHostKeyChecking={}",
                self.host_key_verification.option_value()
            ))
            .arg(src.to_arg())
            .arg(dest.to_arg());

        for (key, value) in &self.env {
            cmd = cmd.env(key.clone(), value.clone());
        }
        cmd
    }
}

/// Resolve an executable from `PATH`.
///
/// Names containing a `/` are checked as given.
pub fn locate_program(name: &str) -> Result<PathBuf, ConfigError> {
    if name.contains('/') {
        let path = PathBuf::from(name);
        return if is_executable(&path) {
            Ok(path)
        } else {
            Err(ConfigError::ProgramNotFound(name.to_string()))
        };
    }

    let search = env::var_os("PATH").ok_or(ConfigError::MissingEnv("PATH"))?;
    locate_in(name, &search)
}

fn locate_in(name: &str, search: &OsStr) -> Result<PathBuf, ConfigError> {
    env::split_paths(search)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
        .ok_or_else(|| ConfigError::ProgramNotFound(name.to_string()))
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// File-transfer clients resolved once per run.
#[derive(Debug, Clone)]
pub struct ToolPaths {
    pub scp: PathBuf,
    pub sftp: PathBuf,
}

impl ToolPaths {
    /// Resolve `scp` and `sftp` from `PATH`.
    pub fn discover() -> Result<Self, ConfigError> {
        let search = env::var_os("PATH").ok_or(ConfigError::MissingEnv("PATH"))?;
        Self::discover_in(&search)
    }

    /// Resolve `scp` and `sftp` from a `PATH`-style search list.
    pub fn discover_in(search: &OsStr) -> Result<Self, ConfigError> {
        Ok(Self {
            scp: locate_in("scp", search)?,
            sftp: locate_in("sftp", search)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn config(verification: HostKeyVerification) -> ScpConfig {
        ScpConfig {
            program: PathBuf::from("/usr/bin/scp"),
            port: 2222,
            user: "cf:1234-abcd/0".into(),
            password: SecretString::from("bearer xyz".to_string()),
            recursive: true,
            host_key_verification: verification,
            known_hosts_path: None,
            env: IndexMap::new(),
            session: SessionConfig::default(),
            pty: PtyConfig::default(),
        }
    }

    fn args(cmd: &CommandSpec) -> Vec<String> {
        cmd.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_command_layout() {
        let cmd = config(HostKeyVerification::Disabled).command(
            &TransferEndpoint::local("/tmp/scp-source"),
            &TransferEndpoint::remote("ssh.example.com", "/home/vcap"),
        );

        assert_eq!(cmd.program, PathBuf::from("/usr/bin/scp"));
        assert_eq!(
            args(&cmd),
            [
                "-r",
                "-P",
                "2222",
                "-oUser=cf:1234-abcd/0",
                "-oUserKnownHostsFile=/dev/null",
                "-oStrictHostKeyChecking=no",
                "/tmp/scp-source",
                "ssh.example.com:/home/vcap",
            ]
        );
    }

    #[test]
    fn test_strict_uses_default_known_hosts() {
        let mut config = config(HostKeyVerification::Strict);
        config.recursive = false;
        let cmd = config.command(
            &TransferEndpoint::remote("h", "f"),
            &TransferEndpoint::local("."),
        );

        let args = args(&cmd);
        assert!(!args.iter().any(|a| a == "-r"));
        assert!(!args.iter().any(|a| a.starts_with("-oUserKnownHostsFile")));
        assert!(args.contains(&"-oStrictHostKeyChecking=yes".to_string()));
    }

    #[test]
    fn test_explicit_known_hosts() {
        let mut config = config(HostKeyVerification::AcceptNew);
        config.known_hosts_path = Some(PathBuf::from("/tmp/known_hosts"));
        let cmd = config.command(
            &TransferEndpoint::remote("h", "f"),
            &TransferEndpoint::local("."),
        );

        let args = args(&cmd);
        assert!(args.contains(&"-oUserKnownHostsFile=/tmp/known_hosts".to_string()));
        assert!(args.contains(&"-oStrictHostKeyChecking=accept-new".to_string()));
    }

    #[test]
    fn test_locate_program_on_path() {
        let sh = locate_program("sh").unwrap();
        assert!(sh.is_absolute());
        assert!(sh.ends_with("sh"));
    }

    #[test]
    fn test_locate_program_missing() {
        let err = locate_program("sshcheck-definitely-not-installed").unwrap_err();
        assert!(matches!(err, ConfigError::ProgramNotFound(_)));
    }

    #[test]
    fn test_locate_program_rejects_non_executable() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("scp");
        fs::write(&file, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o644)).unwrap();

        let name = file.to_string_lossy().into_owned();
        assert!(locate_program(&name).is_err());

        fs::set_permissions(&file, fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(locate_program(&name).unwrap(), file);
    }

    fn install(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_discover_tools_across_search_dirs() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let scp = install(first.path(), "scp");
        let sftp = install(second.path(), "sftp");

        let search = env::join_paths([first.path(), second.path()]).unwrap();
        let tools = ToolPaths::discover_in(&search).unwrap();

        assert_eq!(tools.scp, scp);
        assert_eq!(tools.sftp, sftp);
    }

    #[test]
    fn test_discover_tools_requires_sftp() {
        let dir = tempfile::tempdir().unwrap();
        install(dir.path(), "scp");

        let err = ToolPaths::discover_in(dir.path().as_os_str()).unwrap_err();
        assert!(matches!(err, ConfigError::ProgramNotFound(ref name) if name == "sftp"));
    }
}
