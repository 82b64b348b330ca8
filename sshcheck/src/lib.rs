//! # sshcheck
//!
//! PTY-driven secure-copy sessions for platform acceptance suites.
//!
//! scp only reads passwords from a terminal. sshcheck runs it behind a
//! pseudo-terminal, answers the password prompt with a one-time token,
//! collects everything scp prints afterwards and waits for it to exit
//! under a single deadline. A recursive tree comparison then proves that
//! a round trip through the remote side left the data unchanged.
//!
//! ## Features
//!
//! - Prompt detection across arbitrarily split reads
//! - Output drained to the end even when it arrives after exit
//! - Deadlines that kill and reap a stuck child
//! - Platform CLI glue for tokens, app GUIDs and the SSH gateway
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sshcheck::platform::{CfCli, ssh_user};
//! use sshcheck::{ScpBuilder, TransferFixture};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sshcheck::Error> {
//!     let cf = CfCli::default();
//!     let guid = cf.app_guid("catnip").await?;
//!     let endpoint = cf.ssh_endpoint().await?;
//!
//!     let scp = ScpBuilder::new(ssh_user(&guid, 0))
//!         .port(endpoint.port)
//!         .password(cf.oauth_token().await?)
//!         .build()?;
//!
//!     let fixture = TransferFixture::new()?;
//!     scp.round_trip(fixture.source(), &endpoint.host, "/home/vcap", fixture.target())
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod compare;
pub mod config;
pub mod driver;
pub mod error;
pub mod fixture;
pub mod platform;
pub mod transport;

// Re-export main types for convenience
pub use compare::compare_trees;
pub use config::HarnessConfig;
pub use driver::{ScpBuilder, SecureCopy, SessionConfig, SessionCoordinator, SessionOutcome};
pub use error::{Error, Result};
pub use fixture::TransferFixture;
pub use transport::TransferEndpoint;
