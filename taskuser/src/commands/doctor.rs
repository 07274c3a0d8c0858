use anyhow::Result;
use taskuser_core::config::SandboxConfig;
use taskuser_sandbox::diagnostics;

/// `taskuser doctor`
pub fn cmd_doctor(config: &SandboxConfig) -> Result<()> {
    print!("{}", diagnostics::diagnose(config));
    Ok(())
}
