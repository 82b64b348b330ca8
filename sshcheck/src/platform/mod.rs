//! Platform glue for acceptance runs.
//!
//! Resolves what a transfer needs from the platform CLI: the SSH gateway
//! endpoint, the app GUID that names the login user and a one-time
//! bearer token used as the password.

mod cli;
mod info;

pub use cli::{
    CfCli, CliOutput, REMOTE_ACCESS_LOG, SSH_AUTHORIZED_EVENT, parse_oauth_token, ssh_user,
};
pub use info::{InfoResponse, SshEndpoint, parse_info};
