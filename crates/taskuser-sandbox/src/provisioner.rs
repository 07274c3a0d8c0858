//! Identity provisioner.
//!
//! Creates exactly one sandbox identity. The order of the host-tool steps is
//! a security invariant:
//!
//! 1. generate account name and credential
//! 2. create the home directory
//! 3. strip default group access (`Users`, `Everyone`)
//! 4. disable ACL inheritance
//! 5. create the account (never expires, no self-service password change)
//! 6. grant the account, SYSTEM and Administrators full inherited control
//! 7. add the account to the remote/interactive logon group
//! 8. liveness check: run `whoami` as the account through the exec tool
//!
//! The home directory is never broadly accessible once the account exists,
//! and the grant is never issued before its grantee exists. Any failure in
//! steps 2 to 8 aborts provisioning; a partially provisioned identity is left
//! for the next run's reaper.

use std::fs;
use std::path::Path;
use std::time::Duration;

use taskuser_core::config::SandboxConfig;
use taskuser_core::observability;

use crate::credential::Credential;
use crate::error::SandboxError;
use crate::host::{HostTools, ToolInvocation, ToolOutput};
use crate::identity::{home_dir_for, identity_name_now, SandboxIdentity};
use crate::info_log;
use crate::tools;

pub const STEP_REMOVE_GROUP_ACCESS: &str = "remove default group access";
pub const STEP_DISABLE_INHERITANCE: &str = "disable inheritance";
pub const STEP_CREATE_ACCOUNT: &str = "create account";
pub const STEP_GRANT_FULL_CONTROL: &str = "grant full control";
pub const STEP_ADD_TO_GROUP: &str = "add to logon group";
pub const STEP_LIVENESS_CHECK: &str = "liveness check";

/// Create, lock down and verify a new sandbox identity.
pub fn provision_identity<H>(host: &H, config: &SandboxConfig) -> Result<SandboxIdentity, SandboxError>
where
    H: HostTools + ?Sized,
{
    config.validate()?;

    let name = identity_name_now(&config.prefix);
    let credential = Credential::generate();
    let home_dir = home_dir_for(&config.home_root, &name);
    let timeout = config.tool_timeout();

    info_log!("Creating sandbox user {}...", name);
    create_home_dir(&home_dir)?;

    for group in tools::DEFAULT_ACCESS_GROUPS {
        run_step(
            host,
            STEP_REMOVE_GROUP_ACCESS,
            &tools::remove_group_access(&home_dir, group),
            timeout,
        )?;
    }
    run_step(
        host,
        STEP_DISABLE_INHERITANCE,
        &tools::disable_inheritance(&home_dir),
        timeout,
    )?;
    run_step(
        host,
        STEP_CREATE_ACCOUNT,
        &tools::create_account(&name, &credential, &home_dir),
        timeout,
    )?;
    run_step(
        host,
        STEP_GRANT_FULL_CONTROL,
        &tools::grant_full_control(&home_dir, &name),
        timeout,
    )?;
    run_step(
        host,
        STEP_ADD_TO_GROUP,
        &tools::add_to_group(&config.remote_group, &name),
        timeout,
    )?;
    run_step(
        host,
        STEP_LIVENESS_CHECK,
        &tools::run_as(
            &config.exec_tool,
            &name,
            &credential,
            &home_dir,
            config.impersonation_timeout_secs,
            tools::LIVENESS_COMMAND,
        ),
        timeout,
    )?;

    observability::audit_identity_provisioned(&name, &home_dir.to_string_lossy());
    info_log!("Sandbox user {} is ready ({})", name, home_dir.display());
    Ok(SandboxIdentity::new(name, home_dir, credential))
}

fn create_home_dir(path: &Path) -> Result<(), SandboxError> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder
        .create(path)
        .map_err(|source| SandboxError::CreateHome {
            path: path.to_path_buf(),
            source,
        })
}

/// Run one provisioning step. Any non-zero exit, spawn failure or timeout is fatal.
fn run_step<H>(
    host: &H,
    step: &'static str,
    invocation: &ToolInvocation,
    timeout: Duration,
) -> Result<ToolOutput, SandboxError>
where
    H: HostTools + ?Sized,
{
    info_log!("Running command: {}", invocation.display_redacted());
    let output = host.run(invocation, timeout).map_err(|e| {
        tracing::error!("{} failed: {}", step, e);
        SandboxError::from_tool(step, e)
    })?;
    if !output.success() {
        tracing::error!(
            "{} failed: {} exited with code {}\n{}",
            step,
            invocation.program_name(),
            output.exit_code,
            output.combined()
        );
        return Err(SandboxError::Tool {
            step,
            program: invocation.program_name(),
            exit_code: output.exit_code,
            output: output.combined(),
        });
    }
    if !output.stdout.trim().is_empty() {
        info_log!("{}", output.stdout.trim_end());
    }
    Ok(output)
}
