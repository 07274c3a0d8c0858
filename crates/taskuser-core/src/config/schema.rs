//! Configuration structs grouped by concern.
//!
//! Loaded from environment variables with the shared fallback logic in `loader`.

use super::env_keys::{observability as obv_keys, sandbox as sbx_keys, timeouts};
use super::loader::{env_bool, env_optional, env_or, env_u64};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Prefix used for sandbox account names and home directories.
pub const DEFAULT_PREFIX: &str = "Task_";

/// Windows refuses local account names longer than 20 characters.
pub const MAX_ACCOUNT_NAME_LEN: usize = 20;

/// Width of a seconds-since-epoch timestamp until the year 2286.
pub const EPOCH_SECONDS_DIGITS: usize = 10;

pub const DEFAULT_EXEC_TOOL: &str = r"C:\Users\Administrator\PSTools\PsExec.exe";
pub const DEFAULT_REMOTE_GROUP: &str = "Remote Desktop Users";
pub const DEFAULT_HOME_ROOT: &str = r"C:\Users";

pub const DEFAULT_IMPERSONATION_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_TASK_TIMEOUT_SECS: u64 = 3600;

/// Errors raised by [`SandboxConfig::validate`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Identity prefix must not be empty")]
    EmptyPrefix,

    #[error("Identity prefix '{0}' may only contain ASCII letters, digits, '_' or '-'")]
    InvalidPrefix(String),

    #[error(
        "Identity prefix '{prefix}' is too long: prefix plus {digits} timestamp digits exceeds {max} characters"
    )]
    PrefixTooLong {
        prefix: String,
        digits: usize,
        max: usize,
    },

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// Sandbox identity configuration.
#[derive(Debug, Clone, Serialize)]
pub struct SandboxConfig {
    /// Prefix shared by account names and home directory names.
    pub prefix: String,
    /// Parent directory of every home directory.
    pub home_root: PathBuf,
    /// Privileged execution tool (PsExec-compatible arguments).
    pub exec_tool: PathBuf,
    /// Group granting the account interactive/remote logon.
    pub remote_group: String,
    /// Passed to the exec tool as its impersonation startup timeout.
    pub impersonation_timeout_secs: u64,
    /// Wall-clock bound on each reaping/provisioning tool call.
    pub tool_timeout_secs: u64,
    /// Wall-clock bound on one task run.
    pub task_timeout_secs: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            home_root: default_home_root(),
            exec_tool: PathBuf::from(DEFAULT_EXEC_TOOL),
            remote_group: DEFAULT_REMOTE_GROUP.to_string(),
            impersonation_timeout_secs: DEFAULT_IMPERSONATION_TIMEOUT_SECS,
            tool_timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
            task_timeout_secs: DEFAULT_TASK_TIMEOUT_SECS,
        }
    }
}

impl SandboxConfig {
    /// Load from environment (also loads `.env`), empty values fall back to defaults.
    pub fn from_env() -> Self {
        super::loader::load_dotenv();
        Self {
            prefix: env_or(sbx_keys::TASKUSER_PREFIX, &[], || DEFAULT_PREFIX.to_string()),
            home_root: env_optional(sbx_keys::TASKUSER_HOME_ROOT, &[])
                .map(PathBuf::from)
                .unwrap_or_else(default_home_root),
            exec_tool: PathBuf::from(env_or(
                sbx_keys::TASKUSER_EXEC_TOOL,
                sbx_keys::EXEC_TOOL_ALIASES,
                || DEFAULT_EXEC_TOOL.to_string(),
            )),
            remote_group: env_or(sbx_keys::TASKUSER_REMOTE_GROUP, &[], || {
                DEFAULT_REMOTE_GROUP.to_string()
            }),
            impersonation_timeout_secs: env_u64(
                timeouts::TASKUSER_IMPERSONATION_TIMEOUT_SECS,
                &[],
                DEFAULT_IMPERSONATION_TIMEOUT_SECS,
            ),
            tool_timeout_secs: env_u64(
                timeouts::TASKUSER_TOOL_TIMEOUT_SECS,
                &[],
                DEFAULT_TOOL_TIMEOUT_SECS,
            ),
            task_timeout_secs: env_u64(
                timeouts::TASKUSER_TASK_TIMEOUT_SECS,
                &[],
                DEFAULT_TASK_TIMEOUT_SECS,
            ),
        }
    }

    /// Override with CLI parameters
    pub fn with_cli_overrides(
        mut self,
        prefix: Option<String>,
        home_root: Option<PathBuf>,
        exec_tool: Option<PathBuf>,
    ) -> Self {
        if let Some(prefix) = prefix {
            self.prefix = prefix;
        }
        if let Some(home_root) = home_root {
            self.home_root = home_root;
        }
        if let Some(exec_tool) = exec_tool {
            self.exec_tool = exec_tool;
        }
        self
    }

    /// Reject settings that would produce unusable or unreapable identities.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prefix.is_empty() {
            return Err(ConfigError::EmptyPrefix);
        }
        if !self
            .prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ConfigError::InvalidPrefix(self.prefix.clone()));
        }
        if self.prefix.len() + EPOCH_SECONDS_DIGITS > MAX_ACCOUNT_NAME_LEN {
            return Err(ConfigError::PrefixTooLong {
                prefix: self.prefix.clone(),
                digits: EPOCH_SECONDS_DIGITS,
                max: MAX_ACCOUNT_NAME_LEN,
            });
        }
        if self.impersonation_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("impersonation timeout"));
        }
        if self.tool_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("tool timeout"));
        }
        if self.task_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("task timeout"));
        }
        Ok(())
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }
}

/// Parent of the current user's home directory, e.g. `C:\Users` for
/// `C:\Users\Administrator`.
fn default_home_root() -> PathBuf {
    dirs::home_dir()
        .and_then(|home| home.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_HOME_ROOT))
}

/// Observability settings: quiet, log_level, log_json, audit_log
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
    pub audit_log: Option<String>,
}

impl ObservabilityConfig {
    pub fn from_env() -> &'static Self {
        use std::sync::OnceLock;
        static CACHE: OnceLock<ObservabilityConfig> = OnceLock::new();
        CACHE.get_or_init(|| {
            super::loader::load_dotenv();
            Self {
                quiet: env_bool(obv_keys::TASKUSER_QUIET, &[], false),
                log_level: env_or(obv_keys::TASKUSER_LOG_LEVEL, &[], || {
                    "taskuser=info".to_string()
                }),
                log_json: env_bool(obv_keys::TASKUSER_LOG_JSON, &[], false),
                audit_log: env_optional(obv_keys::TASKUSER_AUDIT_LOG, &[]),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = SandboxConfig::default();
        assert_eq!(cfg.prefix, "Task_");
        assert_eq!(cfg.impersonation_timeout_secs, 10);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_prefixes() {
        let mut cfg = SandboxConfig::default();
        cfg.prefix = String::new();
        assert_eq!(cfg.validate(), Err(ConfigError::EmptyPrefix));

        cfg.prefix = "Task user".to_string();
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::InvalidPrefix("Task user".to_string()))
        );

        cfg.prefix = "SandboxTask_".to_string();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::PrefixTooLong { .. })
        ));

        // 10 + 10 is exactly the limit
        cfg.prefix = "Sandbox_T_".to_string();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_timeouts() {
        let mut cfg = SandboxConfig::default();
        cfg.tool_timeout_secs = 0;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::ZeroTimeout("tool timeout"))
        );
    }

    #[test]
    fn test_cli_overrides() {
        let cfg = SandboxConfig::default().with_cli_overrides(
            Some("Job_".to_string()),
            Some(PathBuf::from("/srv/homes")),
            None,
        );
        assert_eq!(cfg.prefix, "Job_");
        assert_eq!(cfg.home_root, PathBuf::from("/srv/homes"));
        assert_eq!(cfg.exec_tool, PathBuf::from(DEFAULT_EXEC_TOOL));
    }
}
