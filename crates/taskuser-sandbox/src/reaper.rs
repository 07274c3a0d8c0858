//! Stale-identity reaper.
//!
//! Removes sandbox accounts and home directories left behind by earlier
//! (possibly crashed) runs, matching on the identity prefix alone. Cleanup
//! is owned by the next process's startup rather than by this process's
//! shutdown, so a crash can never skip it.
//!
//! Entirely best-effort: every failure becomes a [`Warning`] in the
//! [`ReapReport`] and the scan moves on. Nothing here returns `Err`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use taskuser_core::config::SandboxConfig;
use taskuser_core::observability;

use crate::error::{ReapStage, Warning};
use crate::host::HostTools;
use crate::identity::is_sandbox_name;
use crate::info_log;
use crate::tools;

/// What the reaper removed and what it could not.
#[derive(Debug, Default, Clone)]
pub struct ReapReport {
    pub deleted_accounts: Vec<String>,
    pub removed_home_dirs: Vec<PathBuf>,
    pub warnings: Vec<Warning>,
}

impl ReapReport {
    /// Nothing was found and nothing went wrong.
    pub fn is_noop(&self) -> bool {
        self.deleted_accounts.is_empty()
            && self.removed_home_dirs.is_empty()
            && self.warnings.is_empty()
    }

    fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }
}

/// Remove every stale sandbox account, then every stale home directory.
///
/// The two passes are independent: failing to list accounts does not stop
/// the home directory scan.
pub fn reap_stale_identities<H>(host: &H, config: &SandboxConfig) -> ReapReport
where
    H: HostTools + ?Sized,
{
    info_log!("Looking for existing sandbox identities with prefix '{}'...", config.prefix);
    let mut report = ReapReport::default();
    delete_stale_accounts(host, &config.prefix, config.tool_timeout(), &mut report);
    remove_stale_home_dirs(&config.prefix, &config.home_root, &mut report);
    report
}

/// Delete every account whose name starts with `prefix`.
pub fn delete_stale_accounts<H>(
    host: &H,
    prefix: &str,
    timeout: Duration,
    report: &mut ReapReport,
) where
    H: HostTools + ?Sized,
{
    let listing = tools::list_accounts();
    let output = match host.run(&listing, timeout) {
        Ok(out) if out.success() => out,
        Ok(out) => {
            report.warn(Warning::new(
                ReapStage::ListAccounts,
                listing.display_redacted(),
                format!("exit code {}: {}", out.exit_code, out.combined()),
            ));
            return;
        }
        Err(e) => {
            report.warn(Warning::new(
                ReapStage::ListAccounts,
                listing.display_redacted(),
                e.to_string(),
            ));
            return;
        }
    };

    for name in tools::parse_account_list(&output.stdout) {
        if !is_sandbox_name(prefix, &name) {
            continue;
        }
        info_log!("Attempting to remove sandbox account {}...", name);
        let delete = tools::delete_account(&name);
        match host.run(&delete, timeout) {
            Ok(out) if out.success() => {
                if !out.stdout.trim().is_empty() {
                    info_log!("{}", out.stdout.trim_end());
                }
                observability::audit_identity_reaped(&name, "account", true);
                report.deleted_accounts.push(name);
            }
            Ok(out) => {
                observability::audit_identity_reaped(&name, "account", false);
                report.warn(Warning::new(
                    ReapStage::DeleteAccount,
                    name,
                    format!("exit code {}: {}", out.exit_code, out.combined()),
                ));
            }
            Err(e) => {
                observability::audit_identity_reaped(&name, "account", false);
                report.warn(Warning::new(ReapStage::DeleteAccount, name, e.to_string()));
            }
        }
    }
}

/// Recursively delete every directory under `home_root` whose name starts
/// with `prefix`. Symlinks and plain files are never followed or removed.
pub fn remove_stale_home_dirs(prefix: &str, home_root: &Path, report: &mut ReapReport) {
    remove_stale_home_dirs_with(prefix, home_root, report, |path| fs::remove_dir_all(path))
}

/// [`remove_stale_home_dirs`] with the per-directory removal supplied by the caller.
pub fn remove_stale_home_dirs_with<F>(
    prefix: &str,
    home_root: &Path,
    report: &mut ReapReport,
    remove: F,
) where
    F: Fn(&Path) -> io::Result<()>,
{
    let entries = match fs::read_dir(home_root) {
        Ok(entries) => entries,
        Err(e) => {
            report.warn(Warning::new(
                ReapStage::ListHomeDirs,
                home_root.display().to_string(),
                e.to_string(),
            ));
            return;
        }
    };

    for entry in entries {
        // A failed entry leaves the partial listing usable.
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                report.warn(Warning::new(
                    ReapStage::ListHomeDirs,
                    home_root.display().to_string(),
                    e.to_string(),
                ));
                continue;
            }
        };
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if !is_dir {
            continue;
        }
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if !is_sandbox_name(prefix, name) {
            continue;
        }
        let path = entry.path();
        info_log!("Removing home directory '{}'...", path.display());
        match remove(&path) {
            Ok(()) => {
                observability::audit_identity_reaped(name, "home_dir", true);
                report.removed_home_dirs.push(path);
            }
            Err(e) => {
                observability::audit_identity_reaped(name, "home_dir", false);
                report.warn(Warning::new(
                    ReapStage::RemoveHomeDir,
                    path.display().to_string(),
                    e.to_string(),
                ));
            }
        }
    }
}
