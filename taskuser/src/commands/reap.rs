use std::fmt::Write as _;

use anyhow::{Context, Result};
use taskuser_core::config::SandboxConfig;
use taskuser_sandbox::{reap_stale_identities, ReapReport, SystemHost};

/// `taskuser reap`
///
/// Always succeeds once the configuration is valid; failures are reported as warnings.
pub fn cmd_reap(config: &SandboxConfig) -> Result<()> {
    config.validate().context("Invalid sandbox configuration")?;
    let report = reap_stale_identities(&SystemHost, config);
    print!("{}", format_reap_report(&report));
    Ok(())
}

pub fn format_reap_report(report: &ReapReport) -> String {
    let mut out = String::new();
    if report.is_noop() {
        out.push_str("No stale sandbox identities found.\n");
        return out;
    }
    for name in &report.deleted_accounts {
        let _ = writeln!(out, "Deleted account: {}", name);
    }
    for dir in &report.removed_home_dirs {
        let _ = writeln!(out, "Removed home directory: {}", dir.display());
    }
    for warning in &report.warnings {
        let _ = writeln!(out, "Warning: {}", warning);
    }
    out
}
