//! Launches a prepared task as the sandbox identity and collects the result.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use taskuser_core::observability;

use crate::error::{SandboxError, ToolError};
use crate::host::HostTools;
use crate::info_log;
use crate::wrapper::PreparedCommand;

pub const STEP_LAUNCH_TASK: &str = "launch task";

/// Exit code reported for a task killed at the timeout.
pub const TIMED_OUT_EXIT_CODE: i32 = -1;

/// Execution result of one task.
///
/// A non-zero `exit_code` is the task's own failure, not a sandbox error.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub task_id: String,
    pub exit_code: i32,
    pub timed_out: bool,
    pub duration: Duration,
    pub log_path: PathBuf,
    /// Contents of the per-task log, if it could be read back.
    pub log: Option<String>,
}

impl TaskOutcome {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == 0
    }
}

/// Run `prepared` through `host`, bounded by `timeout`.
///
/// Spawn and wait failures of the exec tool are errors. A timeout is
/// reported as an outcome with `timed_out` set, since the task did start.
pub fn execute_prepared<H>(
    host: &H,
    prepared: &PreparedCommand,
    timeout: Duration,
) -> Result<TaskOutcome, SandboxError>
where
    H: HostTools + ?Sized,
{
    info_log!(
        "Running task {} as {}: {}",
        prepared.task_id,
        prepared.identity,
        prepared.invocation.display_redacted()
    );
    observability::audit_task_launched(
        &prepared.task_id,
        &prepared.identity,
        &prepared.wrapper_script.to_string_lossy(),
    );

    let start = Instant::now();
    let (exit_code, timed_out) = match host.run(&prepared.invocation, timeout) {
        Ok(output) => {
            if !output.stdout.trim().is_empty() {
                info_log!("{}", output.stdout.trim_end());
            }
            if !output.stderr.trim().is_empty() {
                info_log!("{}", output.stderr.trim_end());
            }
            (output.exit_code, false)
        }
        Err(ToolError::Timeout { program, secs }) => {
            tracing::warn!(
                task_id = %prepared.task_id,
                "Task killed: '{}' exceeded {} seconds",
                program,
                secs
            );
            (TIMED_OUT_EXIT_CODE, true)
        }
        Err(e) => {
            tracing::error!(task_id = %prepared.task_id, "Failed to launch task: {}", e);
            return Err(SandboxError::from_tool(STEP_LAUNCH_TASK, e));
        }
    };
    let duration = start.elapsed();

    let log = match fs::read_to_string(&prepared.log_file) {
        Ok(content) => Some(content),
        Err(e) => {
            tracing::debug!(
                "Could not read task log {}: {}",
                prepared.log_file.display(),
                e
            );
            None
        }
    };

    observability::audit_task_completed(
        &prepared.task_id,
        exit_code,
        duration.as_millis() as u64,
        timed_out,
    );
    if exit_code == 0 {
        info_log!("Task {} finished in {:?}", prepared.task_id, duration);
    } else {
        tracing::warn!(
            "Task {} exited with code {} after {:?}",
            prepared.task_id,
            exit_code,
            duration
        );
    }

    Ok(TaskOutcome {
        task_id: prepared.task_id.clone(),
        exit_code,
        timed_out,
        duration,
        log_path: prepared.log_file.clone(),
        log,
    })
}
