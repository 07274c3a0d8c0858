use anyhow::{Context, Result};
use taskuser_core::config::SandboxConfig;
use taskuser_sandbox::{SystemHost, WorkerContext};

use super::reap::format_reap_report;

/// `taskuser startup`
///
/// The credential is never printed; the account is only usable by this process.
pub fn cmd_startup(config: SandboxConfig) -> Result<()> {
    let ctx = WorkerContext::startup(config, SystemHost).context("Sandbox startup failed")?;
    eprint!("{}", format_reap_report(ctx.reap_report()));
    println!("Sandbox identity: {}", ctx.identity().name());
    println!("Home directory: {}", ctx.identity().home_dir().display());
    Ok(())
}
