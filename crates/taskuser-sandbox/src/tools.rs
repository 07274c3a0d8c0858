//! Exact argument shapes of the host tools.
//!
//! Isolation depends on these arguments and on the order the provisioner
//! issues them, so each shape is built in exactly one place.

use std::path::Path;

use crate::credential::Credential;
use crate::host::ToolInvocation;

/// Groups whose default access is stripped from a fresh home directory.
pub const DEFAULT_ACCESS_GROUPS: &[&str] = &["Users", "Everyone"];

/// Principals granted full control besides the sandbox account itself.
pub const PRIVILEGED_PRINCIPALS: &[&str] = &["SYSTEM", "Administrators"];

/// No-op command used to prove the impersonation path works.
pub const LIVENESS_COMMAND: &str = "whoami";

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// `wmic useraccount get name`: one account name per line.
pub fn list_accounts() -> ToolInvocation {
    ToolInvocation::new("wmic")
        .arg("useraccount")
        .arg("get")
        .arg("name")
}

/// `net user <name> /delete`
pub fn delete_account(name: &str) -> ToolInvocation {
    ToolInvocation::new("net").arg("user").arg(name).arg("/delete")
}

/// `icacls <dir> /remove:g <group>`
pub fn remove_group_access(dir: &Path, group: &str) -> ToolInvocation {
    ToolInvocation::new("icacls")
        .arg(path_arg(dir))
        .arg("/remove:g")
        .arg(group)
}

/// `icacls <dir> /inheritance:r`
pub fn disable_inheritance(dir: &Path) -> ToolInvocation {
    ToolInvocation::new("icacls")
        .arg(path_arg(dir))
        .arg("/inheritance:r")
}

/// `net user <name> <password> /add /expires:never /passwordchg:no /homedir:<dir>`
pub fn create_account(name: &str, credential: &Credential, home_dir: &Path) -> ToolInvocation {
    ToolInvocation::new("net")
        .arg("user")
        .arg(name)
        .secret(credential)
        .arg("/add")
        .arg("/expires:never")
        .arg("/passwordchg:no")
        .arg(format!("/homedir:{}", path_arg(home_dir)))
}

/// `icacls <dir> /grant:r <name>:(CI)F SYSTEM:(CI)F Administrators:(CI)F`
///
/// `:r` replaces any explicit ACE for each principal; `(CI)` makes the grant
/// inherited by sub-containers.
pub fn grant_full_control(dir: &Path, name: &str) -> ToolInvocation {
    let mut inv = ToolInvocation::new("icacls")
        .arg(path_arg(dir))
        .arg("/grant:r")
        .arg(format!("{}:(CI)F", name));
    for principal in PRIVILEGED_PRINCIPALS {
        inv = inv.arg(format!("{}:(CI)F", principal));
    }
    inv
}

/// `net localgroup <group> /add <name>`
pub fn add_to_group(group: &str, name: &str) -> ToolInvocation {
    ToolInvocation::new("net")
        .arg("localgroup")
        .arg(group)
        .arg("/add")
        .arg(name)
}

/// `<exec-tool> -u <name> -p <password> -w <dir> -n <secs> <command>`
pub fn run_as(
    exec_tool: &Path,
    name: &str,
    credential: &Credential,
    working_dir: &Path,
    impersonation_timeout_secs: u64,
    command: &str,
) -> ToolInvocation {
    ToolInvocation::new(exec_tool)
        .arg("-u")
        .arg(name)
        .arg("-p")
        .secret(credential)
        .arg("-w")
        .arg(path_arg(working_dir))
        .arg("-n")
        .arg(impersonation_timeout_secs.to_string())
        .arg(command)
}

/// Parse account-listing output into names: split on line breaks, trim
/// `\r`, `\n` and spaces, drop blank lines.
pub fn parse_account_list(stdout: &str) -> Vec<String> {
    stdout
        .split('\n')
        .map(|line| line.trim_matches(|c| c == '\r' || c == '\n' || c == ' '))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
