//! Two outcome tiers.
//!
//! - [`Warning`]: best-effort failures while reaping stale identities. They are
//!   collected and logged, never returned as `Err`.
//! - [`SandboxError`]: fatal failures on the critical path (provisioning,
//!   script generation, task launch). They short-circuit the current phase.

use std::fmt;
use std::path::PathBuf;

use taskuser_core::config::ConfigError;
use thiserror::Error;

/// Low-level failure of one external tool invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait for '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' killed: exceeded timeout of {secs} seconds")]
    Timeout { program: String, secs: u64 },
}

/// Fatal error: the identity or the task launch cannot be trusted.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("Invalid sandbox configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to create home directory {}: {source}", path.display())]
    CreateHome {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Step '{step}' failed: '{program}' exited with code {exit_code}\n{output}")]
    Tool {
        step: &'static str,
        program: String,
        exit_code: i32,
        output: String,
    },

    #[error("Step '{step}' could not start '{program}': {source}")]
    ToolSpawn {
        step: &'static str,
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Step '{step}' timed out: '{program}' exceeded {secs} seconds")]
    ToolTimeout {
        step: &'static str,
        program: String,
        secs: u64,
    },

    #[error("Failed to write script {}: {source}", path.display())]
    WriteScript {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid task id '{0}': must be non-empty and contain only ASCII letters, digits, '_' or '-'")]
    InvalidTaskId(String),
}

impl SandboxError {
    /// Attach the provisioning step name to a low-level tool failure.
    pub fn from_tool(step: &'static str, err: ToolError) -> Self {
        match err {
            ToolError::Spawn { program, source } | ToolError::Wait { program, source } => {
                Self::ToolSpawn {
                    step,
                    program,
                    source,
                }
            }
            ToolError::Timeout { program, secs } => Self::ToolTimeout {
                step,
                program,
                secs,
            },
        }
    }
}

/// Which part of the reaper produced a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReapStage {
    ListAccounts,
    DeleteAccount,
    ListHomeDirs,
    RemoveHomeDir,
}

impl fmt::Display for ReapStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ListAccounts => "list accounts",
            Self::DeleteAccount => "delete account",
            Self::ListHomeDirs => "list home directories",
            Self::RemoveHomeDir => "remove home directory",
        };
        f.write_str(s)
    }
}

/// Best-effort failure. Logged and collected, never aborts startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub stage: ReapStage,
    /// Account name or path the stage was acting on.
    pub subject: String,
    pub message: String,
}

impl Warning {
    pub fn new(stage: ReapStage, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage,
            subject: subject.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not {} '{}': {}", self.stage, self.subject, self.message)
    }
}
