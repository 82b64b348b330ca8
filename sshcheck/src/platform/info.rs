//! Parsing of the platform's `/v2/info` document.

use std::fmt;

use serde::Deserialize;

use crate::error::PlatformError;

/// The subset of `/v2/info` needed to reach the SSH gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct InfoResponse {
    pub app_ssh_endpoint: String,
    #[serde(default)]
    pub app_ssh_oauth_client: Option<String>,
}

/// Host and port of the SSH gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshEndpoint {
    pub host: String,
    pub port: u16,
}

impl SshEndpoint {
    /// Parse `host:port`, with the host optionally in brackets.
    pub fn parse(endpoint: &str) -> Result<Self, PlatformError> {
        let invalid = || PlatformError::InvalidEndpoint(endpoint.to_string());

        let (host, port) = endpoint.rsplit_once(':').ok_or_else(invalid)?;
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        if host.is_empty() {
            return Err(invalid());
        }
        let port = port.parse::<u16>().map_err(|_| invalid())?;

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for SshEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Extract the SSH endpoint from a `/v2/info` body.
pub fn parse_info(body: &str) -> Result<SshEndpoint, PlatformError> {
    let info: InfoResponse = serde_json::from_str(body)?;
    SshEndpoint::parse(&info.app_ssh_endpoint)
}
