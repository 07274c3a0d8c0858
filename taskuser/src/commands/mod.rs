//! CLI commands. Each takes the effective `SandboxConfig` (env + CLI overrides)
//! and talks to the host only through `taskuser_sandbox`.
//!
//!   startup: reap + provision, report the identity
//!   reap: reap only
//!   run: startup, then run tasks serially
//!   doctor: host tool and configuration check

pub mod doctor;
pub mod reap;
pub mod run;
pub mod startup;
