//! Host readiness report for `taskuser doctor`.

use std::path::{Path, PathBuf};

use taskuser_core::config::SandboxConfig;

/// Tools every run needs, resolved through `PATH`.
pub const REQUIRED_TOOLS: &[&str] = &["wmic", "net", "icacls"];

#[derive(Debug, Clone)]
pub struct ToolCheck {
    pub name: String,
    pub resolved: Option<PathBuf>,
}

impl ToolCheck {
    pub fn found(&self) -> bool {
        self.resolved.is_some()
    }
}

/// Resolve a tool by name through `PATH`, or by path if it is one.
pub fn resolve_tool(tool: &Path) -> Option<PathBuf> {
    which::which(tool)
        .ok()
        .or_else(|| tool.is_file().then(|| tool.to_path_buf()))
}

/// Resolve the account/ACL tools and the configured exec tool.
pub fn check_tools(config: &SandboxConfig) -> Vec<ToolCheck> {
    let mut checks: Vec<ToolCheck> = REQUIRED_TOOLS
        .iter()
        .map(|name| ToolCheck {
            name: name.to_string(),
            resolved: resolve_tool(Path::new(name)),
        })
        .collect();
    checks.push(ToolCheck {
        name: config.exec_tool.display().to_string(),
        resolved: resolve_tool(&config.exec_tool),
    });
    checks
}

/// Human-readable report of tool availability and effective configuration.
pub fn diagnose(config: &SandboxConfig) -> String {
    let mut report = String::new();
    report.push_str("=== Sandbox Host Diagnostics ===\n");

    let checks = check_tools(config);
    for check in &checks {
        match &check.resolved {
            Some(path) => report.push_str(&format!("{}: found ({})\n", check.name, path.display())),
            None => report.push_str(&format!("{}: NOT found\n", check.name)),
        }
    }

    report.push_str("\n=== Configuration ===\n");
    report.push_str(&format!("prefix: {}\n", config.prefix));
    report.push_str(&format!("home root: {}\n", config.home_root.display()));
    report.push_str(&format!("exec tool: {}\n", config.exec_tool.display()));
    report.push_str(&format!("remote group: {}\n", config.remote_group));
    report.push_str(&format!(
        "timeouts: impersonation {}s, tool {}s, task {}s\n",
        config.impersonation_timeout_secs, config.tool_timeout_secs, config.task_timeout_secs
    ));
    if let Err(e) = config.validate() {
        report.push_str(&format!("\nConfiguration is INVALID: {}\n", e));
    }

    if checks.iter().any(|c| !c.found()) {
        report.push_str("\nMissing tools will make startup fail. Install PsExec (Sysinternals PSTools)\n");
        report.push_str("and run on a Windows host with administrator rights.\n");
    }
    report
}
