use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// taskuser - run task commands under an ephemeral, locked-down sandbox account
#[derive(Parser, Debug)]
#[command(name = "taskuser")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Overrides for the environment configuration, accepted by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Sandbox account/home-dir prefix (default: from env or "Task_")
    #[arg(long, global = true, value_name = "PREFIX")]
    pub prefix: Option<String>,

    /// Directory holding all home directories (default: from env or the parent of your home)
    #[arg(long, global = true, value_name = "DIR")]
    pub home_root: Option<PathBuf>,

    /// Privileged execution tool, e.g. PsExec.exe (default: from env)
    #[arg(long, global = true, value_name = "PATH")]
    pub exec_tool: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reap stale sandbox accounts, then provision and verify a fresh one
    Startup,

    /// Only remove sandbox accounts and home directories left by earlier runs
    Reap,

    /// Start up, then run task commands as the sandbox account
    Run {
        /// Task id, used to name the generated scripts and log
        #[arg(long, value_name = "ID", required_unless_present = "tasks", conflicts_with = "tasks")]
        task_id: Option<String>,

        /// Command line to run (repeatable, executed in the given order)
        #[arg(long = "command", short = 'c', value_name = "LINE", requires = "task_id")]
        command_lines: Vec<String>,

        /// JSON file with an array of {"task_id": ..., "command": [...]} objects, run serially
        #[arg(long, value_name = "FILE")]
        tasks: Option<PathBuf>,

        /// Task timeout in seconds (default: from env or 3600)
        #[arg(long, value_name = "SECS")]
        task_timeout: Option<u64>,

        /// Extra environment variable for the execution tool (repeatable)
        #[arg(long = "env", short = 'e', value_name = "KEY=VALUE", value_parser = parse_env_pair)]
        envs: Vec<(String, String)>,
    },

    /// Check that the required host tools are available and show the effective configuration
    Doctor,
}

/// Parse `KEY=VALUE`. The value may itself contain `=`.
pub fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_pair() {
        assert_eq!(
            parse_env_pair("A=b=c").unwrap(),
            ("A".to_string(), "b=c".to_string())
        );
        assert_eq!(parse_env_pair("EMPTY=").unwrap().1, "");
        assert!(parse_env_pair("novalue").is_err());
        assert!(parse_env_pair("=x").is_err());
    }

    #[test]
    fn test_run_with_commands() {
        let cli = Cli::try_parse_from([
            "taskuser",
            "run",
            "--task-id",
            "42",
            "-c",
            "echo hi",
            "--command",
            "echo bye",
            "--env",
            "BUILD=1",
            "--prefix",
            "Job_",
        ])
        .unwrap();
        assert_eq!(cli.global.prefix.as_deref(), Some("Job_"));
        match cli.command {
            Commands::Run {
                task_id,
                command_lines,
                envs,
                tasks,
                ..
            } => {
                assert_eq!(task_id.as_deref(), Some("42"));
                assert_eq!(command_lines, vec!["echo hi", "echo bye"]);
                assert_eq!(envs, vec![("BUILD".to_string(), "1".to_string())]);
                assert!(tasks.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_run_requires_task_source() {
        assert!(Cli::try_parse_from(["taskuser", "run"]).is_err());
        assert!(
            Cli::try_parse_from(["taskuser", "run", "--task-id", "1", "--tasks", "t.json"]).is_err()
        );
        assert!(Cli::try_parse_from(["taskuser", "run", "--tasks", "t.json"]).is_ok());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["taskuser", "reap", "--home-root", r"D:\Users"]).unwrap();
        assert!(matches!(cli.command, Commands::Reap));
        assert_eq!(cli.global.home_root, Some(PathBuf::from(r"D:\Users")));
    }
}
