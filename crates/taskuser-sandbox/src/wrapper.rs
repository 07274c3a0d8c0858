//! Command wrapper: turns one task into two scripts in the identity's home
//! directory and an exec-tool invocation that runs them as the identity.
//!
//! Layout for task `<id>`:
//! - `TaskId_<id>.bat`: the task's command lines, in order, CRLF-terminated
//! - `TaskId_<id>_wrapper.bat`: calls the inner script with stdout and
//!   stderr redirected to `TaskId_<id>.log`
//!
//! Files are left on disk after the run for log inspection. Rewrapping the
//! same id overwrites them.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use taskuser_core::config::SandboxConfig;

use crate::error::SandboxError;
use crate::host::ToolInvocation;
use crate::identity::SandboxIdentity;
use crate::tools;

const LINE_ENDING: &str = "\r\n";

/// One execution request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskRun {
    pub task_id: String,
    /// Independent shell command lines, executed in this order.
    #[serde(rename = "command", alias = "commands", default)]
    pub command_lines: Vec<String>,
}

impl TaskRun {
    pub fn new(task_id: impl Into<String>, command_lines: Vec<String>) -> Self {
        Self {
            task_id: task_id.into(),
            command_lines,
        }
    }
}

/// A task ready to launch. `Debug` never shows the credential.
#[derive(Debug, Clone)]
pub struct PreparedCommand {
    pub task_id: String,
    pub identity: String,
    pub invocation: ToolInvocation,
    pub working_dir: PathBuf,
    pub wrapper_script: PathBuf,
    pub inner_script: PathBuf,
    pub log_file: PathBuf,
}

impl PreparedCommand {
    /// Extra environment variable for the exec-tool process.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.invocation = self.invocation.env(key, value);
        self
    }
}

pub fn inner_script_name(task_id: &str) -> String {
    format!("TaskId_{}.bat", task_id)
}

pub fn wrapper_script_name(task_id: &str) -> String {
    format!("TaskId_{}_wrapper.bat", task_id)
}

pub fn log_file_name(task_id: &str) -> String {
    format!("TaskId_{}.log", task_id)
}

/// Task ids become file names: `[A-Za-z0-9_-]+` only.
pub fn validate_task_id(task_id: &str) -> Result<(), SandboxError> {
    let valid = !task_id.is_empty()
        && task_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(SandboxError::InvalidTaskId(task_id.to_string()))
    }
}

/// Inner script: one line per command, in order.
pub fn render_inner_script(command_lines: &[String]) -> String {
    let mut script = String::new();
    for line in command_lines {
        script.push_str(line);
        script.push_str(LINE_ENDING);
    }
    script
}

/// Outer script: run the inner script with combined output sent to the log.
pub fn render_wrapper_script(task_id: &str, inner_script: &Path) -> String {
    format!(
        ":: This script runs the command(s) defined in TaskId {id}...{eol}call \"{inner}\" > {log} 2>&1{eol}",
        id = task_id,
        inner = inner_script.display(),
        log = log_file_name(task_id),
        eol = LINE_ENDING,
    )
}

/// Write both scripts and build the exec-tool invocation for `task`.
///
/// Any write failure aborts; no invocation is returned for a half-written task.
pub fn wrap_task(
    identity: &SandboxIdentity,
    config: &SandboxConfig,
    task: &TaskRun,
) -> Result<PreparedCommand, SandboxError> {
    validate_task_id(&task.task_id)?;

    let home = identity.home_dir();
    let inner_script = home.join(inner_script_name(&task.task_id));
    let wrapper_script = home.join(wrapper_script_name(&task.task_id));
    let log_file = home.join(log_file_name(&task.task_id));

    write_script(&wrapper_script, &render_wrapper_script(&task.task_id, &inner_script))?;
    write_script(&inner_script, &render_inner_script(&task.command_lines))?;
    tracing::debug!(
        task_id = %task.task_id,
        lines = task.command_lines.len(),
        wrapper = %wrapper_script.display(),
        "Task scripts written"
    );

    let invocation = tools::run_as(
        &config.exec_tool,
        identity.name(),
        identity.credential(),
        home,
        config.impersonation_timeout_secs,
        &wrapper_script.to_string_lossy(),
    );

    Ok(PreparedCommand {
        task_id: task.task_id.clone(),
        identity: identity.name().to_string(),
        invocation,
        working_dir: home.to_path_buf(),
        wrapper_script,
        inner_script,
        log_file,
    })
}

fn write_script(path: &Path, content: &str) -> Result<(), SandboxError> {
    let to_err = |source| SandboxError::WriteScript {
        path: path.to_path_buf(),
        source,
    };
    fs::write(path, content).map_err(to_err)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o700)).map_err(to_err)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::Credential;

    fn identity_in(dir: &Path) -> SandboxIdentity {
        let home = dir.join("Task_1700000000");
        fs::create_dir_all(&home).unwrap();
        SandboxIdentity::new("Task_1700000000".to_string(), home, Credential::generate())
    }

    fn lines(cmds: &[&str]) -> Vec<String> {
        cmds.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_wrap_task_writes_scripts_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let identity = identity_in(tmp.path());
        let task = TaskRun::new("42", lines(&["echo hi", "echo bye"]));

        let prepared = wrap_task(&identity, &SandboxConfig::default(), &task).unwrap();

        let home = identity.home_dir();
        assert_eq!(prepared.inner_script, home.join("TaskId_42.bat"));
        assert_eq!(prepared.wrapper_script, home.join("TaskId_42_wrapper.bat"));
        assert_eq!(prepared.log_file, home.join("TaskId_42.log"));
        assert_eq!(prepared.working_dir, home);

        let inner = fs::read_to_string(&prepared.inner_script).unwrap();
        assert_eq!(inner, "echo hi\r\necho bye\r\n");

        let wrapper = fs::read_to_string(&prepared.wrapper_script).unwrap();
        let wrapper_lines: Vec<&str> = wrapper.split("\r\n").collect();
        assert_eq!(
            wrapper_lines[0],
            ":: This script runs the command(s) defined in TaskId 42..."
        );
        assert!(wrapper_lines[1].starts_with("call \""));
        assert!(wrapper_lines[1].contains("TaskId_42.bat\""));
        assert!(wrapper_lines[1].ends_with("> TaskId_42.log 2>&1"));
    }

    #[test]
    fn test_invocation_runs_wrapper_as_identity() {
        let tmp = tempfile::tempdir().unwrap();
        let identity = identity_in(tmp.path());
        let task = TaskRun::new("7", lines(&["dir"]));

        let prepared = wrap_task(&identity, &SandboxConfig::default(), &task)
            .unwrap()
            .with_env("TASK_ID", "7");

        let args = prepared.invocation.redacted_args();
        assert_eq!(args[0..4], ["-u", "Task_1700000000", "-p", "********"]);
        assert_eq!(args[4], "-w");
        assert_eq!(args[5], identity.home_dir().to_string_lossy());
        assert_eq!(args[6..8], ["-n", "10"]);
        assert_eq!(args[8], prepared.wrapper_script.to_string_lossy());
        assert_eq!(prepared.invocation.program_name(), "PsExec.exe");
        assert_eq!(
            prepared.invocation.envs(),
            &[("TASK_ID".to_string(), "7".to_string())]
        );
        assert!(!format!("{:?}", prepared).contains(identity.credential().expose()));
    }

    #[test]
    fn test_empty_command_list_gives_empty_inner_script() {
        let tmp = tempfile::tempdir().unwrap();
        let identity = identity_in(tmp.path());

        let prepared =
            wrap_task(&identity, &SandboxConfig::default(), &TaskRun::new("empty", vec![])).unwrap();

        assert_eq!(fs::read_to_string(&prepared.inner_script).unwrap(), "");
        assert!(prepared.wrapper_script.exists());
    }

    #[test]
    fn test_rewrap_overwrites_rather_than_appends() {
        let tmp = tempfile::tempdir().unwrap();
        let identity = identity_in(tmp.path());
        let config = SandboxConfig::default();

        wrap_task(&identity, &config, &TaskRun::new("42", lines(&["echo a", "echo b"]))).unwrap();
        let prepared =
            wrap_task(&identity, &config, &TaskRun::new("42", lines(&["echo c"]))).unwrap();

        assert_eq!(fs::read_to_string(&prepared.inner_script).unwrap(), "echo c\r\n");
        let wrapper = fs::read_to_string(&prepared.wrapper_script).unwrap();
        assert_eq!(wrapper.matches("call ").count(), 1);
    }

    #[test]
    fn test_invalid_task_ids_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let identity = identity_in(tmp.path());
        for bad in ["", "..", "../x", r"a\b", "a b", "x&y"] {
            let err = wrap_task(&identity, &SandboxConfig::default(), &TaskRun::new(bad, vec![]))
                .unwrap_err();
            assert!(matches!(err, SandboxError::InvalidTaskId(_)), "{:?}", bad);
        }
        // Nothing was written for rejected ids
        assert_eq!(fs::read_dir(identity.home_dir()).unwrap().count(), 0);
        assert!(validate_task_id("build-42_a").is_ok());
    }

    #[test]
    fn test_write_failure_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let identity = SandboxIdentity::new(
            "Task_1".to_string(),
            tmp.path().join("missing"),
            Credential::generate(),
        );

        let err = wrap_task(&identity, &SandboxConfig::default(), &TaskRun::new("1", vec![]))
            .unwrap_err();

        assert!(matches!(err, SandboxError::WriteScript { .. }));
    }

    #[test]
    fn test_task_run_from_json() {
        let tasks: Vec<TaskRun> = serde_json::from_str(
            r#"[{"task_id": "1", "command": ["echo a", "echo b"]}, {"task_id": "2"}]"#,
        )
        .unwrap();
        assert_eq!(tasks[0], TaskRun::new("1", lines(&["echo a", "echo b"])));
        assert!(tasks[1].command_lines.is_empty());
    }
}
