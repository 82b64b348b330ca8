//! Run configuration loaded from JSON.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

use crate::error::ConfigError;

/// Acceptance run settings, read once per run.
///
/// The file is named by the `CONFIG` environment variable:
///
/// ```json
/// {
///   "api": "api.bosh-lite.com",
///   "admin_user": "admin",
///   "admin_password": "admin",
///   "apps_domain": "bosh-lite.com",
///   "skip_ssl_validation": true
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct HarnessConfig {
    pub api: String,
    pub admin_user: String,
    #[serde(deserialize_with = "secret")]
    pub admin_password: SecretString,
    pub apps_domain: String,
    #[serde(default)]
    pub skip_ssl_validation: bool,
    #[serde(default)]
    pub artifacts_directory: Option<PathBuf>,
    /// Seconds.
    #[serde(default = "default_timeout")]
    pub default_timeout: u64,
    /// Seconds.
    #[serde(default = "default_push_timeout")]
    pub cf_push_timeout: u64,
}

fn default_timeout() -> u64 {
    60
}

fn default_push_timeout() -> u64 {
    240
}

fn secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

impl HarnessConfig {
    /// Variable naming the config file.
    pub const ENV_VAR: &'static str = "CONFIG";

    /// Load from the file named by `CONFIG`.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var_os(Self::ENV_VAR).ok_or(ConfigError::MissingEnv(Self::ENV_VAR))?;
        Self::from_path(path)
    }

    /// Load from an explicit path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("api", &self.api),
            ("admin_user", &self.admin_user),
            ("apps_domain", &self.apps_domain),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    message: format!("{} must not be empty", name),
                });
            }
        }
        if self.default_timeout == 0 {
            return Err(ConfigError::Invalid {
                message: "default_timeout must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Deadline for a single transfer.
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout)
    }

    /// Deadline for pushing an app.
    pub fn push_timeout(&self) -> Duration {
        Duration::from_secs(self.cf_push_timeout)
    }
}
