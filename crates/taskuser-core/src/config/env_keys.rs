//! Environment variable keys.
//!
//! Primary variables use the `TASKUSER_*` namespace. Aliases are read only
//! when the primary key is unset.

/// Sandbox identity provisioning.
pub mod sandbox {
    /// Prefix shared by every sandbox account name and home directory.
    pub const TASKUSER_PREFIX: &str = "TASKUSER_PREFIX";

    /// Directory holding all user home directories (e.g. `C:\Users`).
    pub const TASKUSER_HOME_ROOT: &str = "TASKUSER_HOME_ROOT";

    /// Privileged execution tool used to run commands as the identity.
    pub const TASKUSER_EXEC_TOOL: &str = "TASKUSER_EXEC_TOOL";
    pub const EXEC_TOOL_ALIASES: &[&str] = &["PSEXEC_PATH"];

    /// Local group that grants the identity interactive/remote logon.
    pub const TASKUSER_REMOTE_GROUP: &str = "TASKUSER_REMOTE_GROUP";
}

/// Timeouts, all in seconds.
pub mod timeouts {
    pub const TASKUSER_IMPERSONATION_TIMEOUT_SECS: &str = "TASKUSER_IMPERSONATION_TIMEOUT_SECS";
    pub const TASKUSER_TOOL_TIMEOUT_SECS: &str = "TASKUSER_TOOL_TIMEOUT_SECS";
    pub const TASKUSER_TASK_TIMEOUT_SECS: &str = "TASKUSER_TASK_TIMEOUT_SECS";
}

/// Logging and audit.
pub mod observability {
    pub const TASKUSER_QUIET: &str = "TASKUSER_QUIET";
    pub const TASKUSER_LOG_LEVEL: &str = "TASKUSER_LOG_LEVEL";
    pub const TASKUSER_LOG_JSON: &str = "TASKUSER_LOG_JSON";
    pub const TASKUSER_AUDIT_LOG: &str = "TASKUSER_AUDIT_LOG";
}
