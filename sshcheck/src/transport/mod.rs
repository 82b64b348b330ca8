//! Secure-copy invocation: endpoints, command line and program lookup.
//!
//! The scp executable itself is an external program; this module only
//! decides how it is invoked.

pub mod config;
mod endpoint;

pub use config::{HostKeyVerification, ScpConfig, ToolPaths, locate_program};
pub use endpoint::TransferEndpoint;
