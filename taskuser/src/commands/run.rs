use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use taskuser_core::config::SandboxConfig;
use taskuser_sandbox::{SystemHost, TaskOutcome, TaskRun, WorkerContext};

/// Where `taskuser run` takes its tasks from.
#[derive(Debug)]
pub struct RunArgs<'a> {
    pub task_id: Option<&'a str>,
    pub command_lines: &'a [String],
    pub tasks_file: Option<&'a Path>,
    pub task_timeout: Option<u64>,
    pub envs: &'a [(String, String)],
}

/// `taskuser run`
///
/// Startup failure aborts before any task runs. Tasks then run one at a time
/// under the same identity; the command fails if any task did.
pub fn cmd_run(mut config: SandboxConfig, args: RunArgs<'_>) -> Result<()> {
    if let Some(secs) = args.task_timeout {
        config.task_timeout_secs = secs;
    }
    let tasks = collect_tasks(args.task_id, args.command_lines, args.tasks_file)?;
    if tasks.is_empty() {
        eprintln!("No tasks to run.");
        return Ok(());
    }

    let mut ctx = WorkerContext::startup(config, SystemHost).context("Sandbox startup failed")?;
    tracing::info!(
        identity = %ctx.identity().name(),
        tasks = tasks.len(),
        "Sandbox ready"
    );

    let mut failed = 0usize;
    for task in &tasks {
        let mut prepared = ctx
            .prepare(task)
            .with_context(|| format!("Failed to prepare task {}", task.task_id))?;
        for (key, value) in args.envs {
            prepared = prepared.with_env(key.as_str(), value.as_str());
        }
        let outcome = ctx
            .run_prepared(&prepared)
            .with_context(|| format!("Failed to run task {}", task.task_id))?;
        print_outcome(&outcome);
        if !outcome.success() {
            failed += 1;
        }
    }

    if failed > 0 {
        bail!("{} of {} task(s) failed", failed, tasks.len());
    }
    Ok(())
}

/// Tasks from `--tasks FILE`, or a single task from `--task-id` and `--command`.
pub fn collect_tasks(
    task_id: Option<&str>,
    command_lines: &[String],
    tasks_file: Option<&Path>,
) -> Result<Vec<TaskRun>> {
    if let Some(path) = tasks_file {
        return load_tasks(path);
    }
    match task_id {
        Some(id) => Ok(vec![TaskRun::new(id, command_lines.to_vec())]),
        None => bail!("either --task-id or --tasks is required"),
    }
}

/// Load a JSON array of `{"task_id": ..., "command": [...]}` objects.
pub fn load_tasks(path: &Path) -> Result<Vec<TaskRun>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read tasks file: {}", path.display()))?;
    let tasks: Vec<TaskRun> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid tasks file: {}", path.display()))?;
    Ok(tasks)
}

fn print_outcome(outcome: &TaskOutcome) {
    if let Some(log) = &outcome.log {
        print!("{}", log);
    }
    let status = if outcome.timed_out {
        "timed out".to_string()
    } else {
        format!("exit code {}", outcome.exit_code)
    };
    eprintln!(
        "Task {}: {} in {:.1}s (log: {})",
        outcome.task_id,
        status,
        outcome.duration.as_secs_f64(),
        outcome.log_path.display()
    );
}
