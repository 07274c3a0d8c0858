//! Ephemeral sandbox identities for task workers.
//!
//! Startup reaps identities left by earlier runs, then provisions one fresh,
//! locked-down account. Each task is wrapped into scripts in that account's
//! home directory and launched through the privileged execution tool.

pub mod common;
pub mod context;
pub mod credential;
pub mod diagnostics;
pub mod error;
pub mod host;
pub mod identity;
pub mod log;
pub mod provisioner;
pub mod reaper;
pub mod runner;
pub mod tools;
pub mod wrapper;

#[cfg(test)]
mod test_support;

pub use context::WorkerContext;
pub use credential::Credential;
pub use error::{ReapStage, SandboxError, ToolError, Warning};
pub use host::{HostTools, SystemHost, ToolInvocation, ToolOutput};
pub use identity::SandboxIdentity;
pub use reaper::{reap_stale_identities, ReapReport};
pub use runner::TaskOutcome;
pub use wrapper::{PreparedCommand, TaskRun};
