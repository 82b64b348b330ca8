//! Local and remote transfer endpoints.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// One side of a secure-copy transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEndpoint {
    /// A path on this machine.
    Local(PathBuf),

    /// `host:path` on the remote side. An empty path means the remote home.
    Remote { host: String, path: String },
}

impl TransferEndpoint {
    /// A local path endpoint.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::Local(path.into())
    }

    /// A remote `host:path` endpoint.
    pub fn remote(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Remote {
            host: host.into(),
            path: path.into(),
        }
    }

    /// Parse an endpoint the way scp reads its operands.
    ///
    /// A colon before any `/` makes the operand remote. A host in square
    /// brackets may itself contain colons (`[::1]:dir`).
    pub fn parse(operand: &str) -> Self {
        if let Some(rest) = operand.strip_prefix('[') {
            if let Some((host, tail)) = rest.split_once(']') {
                if let Some(path) = tail.strip_prefix(':') {
                    return Self::remote(host, path);
                }
            }
            return Self::local(operand);
        }

        match operand.find(':') {
            Some(0) | None => Self::local(operand),
            Some(colon) => {
                if operand[..colon].contains('/') {
                    Self::local(operand)
                } else {
                    Self::remote(&operand[..colon], &operand[colon + 1..])
                }
            }
        }
    }

    /// Whether this endpoint lives on the remote side.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    /// The local path, if this is a local endpoint.
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            Self::Local(path) => Some(path),
            Self::Remote { .. } => None,
        }
    }

    /// The operand as passed on the scp command line.
    pub fn to_arg(&self) -> OsString {
        match self {
            Self::Local(path) => path.as_os_str().to_owned(),
            Self::Remote { .. } => OsString::from(self.to_string()),
        }
    }
}

impl fmt::Display for TransferEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote { host, path } if host.contains(':') => write!(f, "[{}]:{}", host, path),
            Self::Remote { host, path } => write!(f, "{}:{}", host, path),
        }
    }
}
