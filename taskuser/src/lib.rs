//! taskuser CLI library: argument parsing and command dispatch.

mod cli;
mod command_registry;
mod commands;
mod dispatch;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use command_registry::CommandRegistry;
use taskuser_core::config::SandboxConfig;

/// Run the CLI: load config (env, then `--prefix`/`--home-root`/`--exec-tool`),
/// init tracing, dispatch.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    taskuser_core::observability::init_tracing();

    let config = SandboxConfig::from_env().with_cli_overrides(
        cli.global.prefix.clone(),
        cli.global.home_root.clone(),
        cli.global.exec_tool.clone(),
    );
    tracing::debug!(?config, "Effective sandbox configuration");

    let mut registry = CommandRegistry::new();
    dispatch::register_all(&mut registry);
    registry.dispatch(&cli.command, config)
}
