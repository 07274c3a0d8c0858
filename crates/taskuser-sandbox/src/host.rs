//! HostTools trait: the only path from this crate to external processes.
//!
//! Isolation is provided by platform tools (`icacls`, `net`, `wmic`, PsExec),
//! not by this crate. Every call goes through [`HostTools::run`] so that the
//! exact argument shapes and their order can be observed in tests.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use zeroize::Zeroizing;

use crate::common::wait_with_timeout;
use crate::credential::Credential;
use crate::error::ToolError;

/// Placeholder printed instead of secret arguments.
pub const REDACTED: &str = "********";

/// One command-line argument. Secrets are wiped on drop and redacted in logs.
#[derive(Clone)]
pub enum ToolArg {
    Plain(String),
    Secret(Zeroizing<String>),
}

impl ToolArg {
    fn exposed(&self) -> &str {
        match self {
            Self::Plain(s) => s,
            Self::Secret(s) => s.as_str(),
        }
    }

    fn redacted(&self) -> &str {
        match self {
            Self::Plain(s) => s,
            Self::Secret(_) => REDACTED,
        }
    }
}

impl fmt::Debug for ToolArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.redacted())
    }
}

/// A fully specified external tool call.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    program: PathBuf,
    args: Vec<ToolArg>,
    envs: Vec<(String, String)>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(ToolArg::Plain(arg.into()));
        self
    }

    pub fn secret(mut self, credential: &Credential) -> Self {
        self.args
            .push(ToolArg::Secret(Zeroizing::new(credential.expose().to_string())));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Short program name for error messages (`PsExec.exe` rather than the full path).
    pub fn program_name(&self) -> String {
        let raw = self.program.to_string_lossy();
        raw.rsplit(['\\', '/'])
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(&raw)
            .to_string()
    }

    /// Arguments with secrets replaced by [`REDACTED`].
    pub fn redacted_args(&self) -> Vec<&str> {
        self.args.iter().map(ToolArg::redacted).collect()
    }

    pub(crate) fn exposed_args(&self) -> Vec<&str> {
        self.args.iter().map(ToolArg::exposed).collect()
    }

    pub fn envs(&self) -> &[(String, String)] {
        &self.envs
    }

    /// `'prog' 'arg1' 'arg2'` with secrets masked. Safe to log.
    pub fn display_redacted(&self) -> String {
        let mut parts = vec![self.program.to_string_lossy().into_owned()];
        parts.extend(self.redacted_args().into_iter().map(str::to_string));
        format!("'{}'", parts.join("' '"))
    }

    /// Build the real process. stdout/stderr are piped for [`wait_with_timeout`].
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.exposed_args());
        for (k, v) in &self.envs {
            cmd.env(k, v);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

/// Captured result of a tool that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// stdout followed by stderr, for failure reports.
    pub fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr.trim_end()),
            (false, true) => self.stdout.trim_end().to_string(),
            (true, false) => self.stderr.trim_end().to_string(),
            (true, true) => String::new(),
        }
    }
}

/// Extension point for executing host tools.
///
/// Calls are synchronous: `run` returns only once the child has exited or
/// has been killed for exceeding `timeout`.
pub trait HostTools {
    fn run(&self, invocation: &ToolInvocation, timeout: Duration) -> Result<ToolOutput, ToolError>;
}

/// Runs tools as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHost;

impl HostTools for SystemHost {
    fn run(&self, invocation: &ToolInvocation, timeout: Duration) -> Result<ToolOutput, ToolError> {
        let program = invocation.program_name();
        let mut child = invocation
            .to_command()
            .spawn()
            .map_err(|source| ToolError::Spawn {
                program: program.clone(),
                source,
            })?;
        wait_with_timeout(&mut child, &program, timeout)
    }
}
