//! Session driving: prompt injection, drain and exit.
//!
//! [`SessionCoordinator`] runs one child behind a pty. [`SecureCopy`] builds
//! scp command lines on top of it and is what most callers want.

mod builder;
mod coordinator;
mod injector;
pub(crate) mod response;
mod transfer;

pub use builder::ScpBuilder;
pub use coordinator::{SessionConfig, SessionCoordinator, SessionState};
pub use injector::inject_on_prompt;
pub use response::SessionOutcome;
pub use transfer::SecureCopy;
