//! Command dispatch: each subcommand's handler is registered here.

use crate::cli::Commands;
use crate::command_registry::CommandRegistry;
use crate::commands;

pub fn register_all(reg: &mut CommandRegistry) {
    reg.register(|cmd, config| {
        matches!(cmd, Commands::Startup).then(|| commands::startup::cmd_startup(config))
    });
    reg.register(|cmd, config| {
        matches!(cmd, Commands::Reap).then(|| commands::reap::cmd_reap(&config))
    });
    reg.register(|cmd, config| {
        matches!(cmd, Commands::Doctor).then(|| commands::doctor::cmd_doctor(&config))
    });
    register_run(reg);
}

fn register_run(reg: &mut CommandRegistry) {
    reg.register(|cmd, config| {
        if let Commands::Run {
            task_id,
            command_lines,
            tasks,
            task_timeout,
            envs,
        } = cmd
        {
            Some(commands::run::cmd_run(
                config,
                commands::run::RunArgs {
                    task_id: task_id.as_deref(),
                    command_lines,
                    tasks_file: tasks.as_deref(),
                    task_timeout: *task_timeout,
                    envs,
                },
            ))
        } else {
            None
        }
    });
}
