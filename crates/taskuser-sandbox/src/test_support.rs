//! In-memory host used by unit tests.
//!
//! `FakeHost` interprets the tool invocations built in `tools` against a
//! small model of the machine: local accounts, per-directory ACL state and
//! group memberships. It records every call and every ordering violation
//! (an account created while its home directory is still broadly
//! accessible, a grant issued before the account exists).

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ToolError;
use crate::host::{HostTools, ToolInvocation, ToolOutput};
use crate::tools::DEFAULT_ACCESS_GROUPS;

/// One recorded invocation, secrets included.
#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub program: String,
    pub args: Vec<String>,
}

impl Call {
    pub fn is(&self, program: &str, marker: &str) -> bool {
        self.program.eq_ignore_ascii_case(program) && self.args.iter().any(|a| a == marker)
    }

    pub fn is_exec_tool(&self) -> bool {
        self.program == "PsExec.exe"
    }
}

/// How an injected failure manifests.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Failure {
    Exit(i32),
    Spawn,
    Timeout,
}

#[derive(Debug, Default)]
struct DirAcl {
    default_groups: BTreeSet<String>,
    inheritance: bool,
    grants: BTreeSet<String>,
}

impl DirAcl {
    fn fresh() -> Self {
        Self {
            default_groups: DEFAULT_ACCESS_GROUPS.iter().map(|g| g.to_string()).collect(),
            inheritance: true,
            grants: BTreeSet::new(),
        }
    }

    fn broadly_accessible(&self) -> bool {
        !self.default_groups.is_empty() || self.inheritance
    }
}

type FailRule = Box<dyn Fn(&Call) -> Option<Failure>>;

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    accounts: BTreeMap<String, String>,
    groups: BTreeMap<String, BTreeSet<String>>,
    acls: BTreeMap<PathBuf, DirAcl>,
    violations: Vec<String>,
    fail_rules: Vec<FailRule>,
}

#[derive(Default)]
pub(crate) struct FakeHost {
    state: RefCell<State>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-existing account, e.g. left over from a crashed run.
    pub fn with_account(self, name: &str) -> Self {
        self.state
            .borrow_mut()
            .accounts
            .insert(name.to_string(), String::new());
        self
    }

    pub fn fail_if(self, rule: impl Fn(&Call) -> Option<Failure> + 'static) -> Self {
        self.state.borrow_mut().fail_rules.push(Box::new(rule));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn accounts(&self) -> Vec<String> {
        self.state.borrow().accounts.keys().cloned().collect()
    }

    pub fn has_account(&self, name: &str) -> bool {
        self.state.borrow().accounts.contains_key(name)
    }

    pub fn password_of(&self, name: &str) -> Option<String> {
        self.state.borrow().accounts.get(name).cloned()
    }

    pub fn group_members(&self, group: &str) -> Vec<String> {
        self.state
            .borrow()
            .groups
            .get(group)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn broadly_accessible(&self, dir: &Path) -> bool {
        self.state
            .borrow()
            .acls
            .get(dir)
            .map(DirAcl::broadly_accessible)
            .unwrap_or(true)
    }

    pub fn grants(&self, dir: &Path) -> Vec<String> {
        self.state
            .borrow()
            .acls
            .get(dir)
            .map(|a| a.grants.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn violations(&self) -> Vec<String> {
        self.state.borrow().violations.clone()
    }

    fn ok(stdout: impl Into<String>) -> Result<ToolOutput, ToolError> {
        Ok(ToolOutput {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
        })
    }

    fn exit(code: i32, stderr: &str) -> Result<ToolOutput, ToolError> {
        Ok(ToolOutput {
            stdout: String::new(),
            stderr: stderr.to_string(),
            exit_code: code,
        })
    }

    fn interpret(state: &mut State, call: &Call) -> Result<ToolOutput, ToolError> {
        let args: Vec<&str> = call.args.iter().map(String::as_str).collect();
        match (call.program.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("wmic", ["useraccount", "get", "name"]) => {
                let mut out = String::from("Name  \r\r\n");
                for name in state.accounts.keys() {
                    out.push_str(&format!("{}  \r\r\n", name));
                }
                out.push_str("\r\r\n");
                Self::ok(out)
            }
            ("net", ["user", name, "/delete"]) => {
                if state.accounts.remove(*name).is_some() {
                    for members in state.groups.values_mut() {
                        members.remove(*name);
                    }
                    Self::ok("The command completed successfully.\r\n")
                } else {
                    Self::exit(2, "The user name could not be found.")
                }
            }
            ("net", ["user", name, password, "/add", rest @ ..]) => {
                let home = rest
                    .iter()
                    .find_map(|a| a.strip_prefix("/homedir:"))
                    .map(PathBuf::from);
                if let Some(ref home) = home {
                    let acl = state.acls.entry(home.clone()).or_insert_with(DirAcl::fresh);
                    if acl.broadly_accessible() {
                        state.violations.push(format!(
                            "account {} created while {} is broadly accessible",
                            name,
                            home.display()
                        ));
                    }
                }
                if state.accounts.contains_key(*name) {
                    return Self::exit(2, "The account already exists.");
                }
                state.accounts.insert(name.to_string(), password.to_string());
                Self::ok("The command completed successfully.\r\n")
            }
            ("net", ["localgroup", group, "/add", name]) => {
                if !state.accounts.contains_key(*name) {
                    return Self::exit(2, "There is no such global user or group.");
                }
                state
                    .groups
                    .entry(group.to_string())
                    .or_default()
                    .insert(name.to_string());
                Self::ok("The command completed successfully.\r\n")
            }
            ("icacls", [dir, "/remove:g", group]) => {
                let acl = state.acls.entry(PathBuf::from(dir)).or_insert_with(DirAcl::fresh);
                acl.default_groups.remove(*group);
                Self::ok("processed file: ok\r\n")
            }
            ("icacls", [dir, "/inheritance:r"]) => {
                let acl = state.acls.entry(PathBuf::from(dir)).or_insert_with(DirAcl::fresh);
                acl.inheritance = false;
                Self::ok("processed file: ok\r\n")
            }
            ("icacls", [dir, "/grant:r", grants @ ..]) => {
                let principals: Vec<String> = grants
                    .iter()
                    .filter_map(|g| g.split(':').next())
                    .map(str::to_string)
                    .collect();
                for p in &principals {
                    let builtin = p == "SYSTEM" || p == "Administrators";
                    if !builtin && !state.accounts.contains_key(p) {
                        state
                            .violations
                            .push(format!("grant to {} before the account exists", p));
                    }
                }
                let acl = state.acls.entry(PathBuf::from(dir)).or_insert_with(DirAcl::fresh);
                acl.grants.extend(principals);
                Self::ok("processed file: ok\r\n")
            }
            (_, ["-u", name, "-p", password, "-w", dir, "-n", _, command]) => {
                let logged_in = state.accounts.get(*name).map(String::as_str) == Some(*password);
                let granted = state
                    .acls
                    .get(Path::new(dir))
                    .map(|a| a.grants.contains(*name))
                    .unwrap_or(false);
                if !logged_in || !granted {
                    return Self::exit(1, "Logon failure: unknown user name or bad password.");
                }
                if *command == "whoami" {
                    return Self::ok(format!("host\\{}\r\n", name.to_lowercase()));
                }
                run_wrapper_script(Path::new(command))
            }
            _ => Self::exit(1, "unrecognised invocation"),
        }
    }
}

/// Execute a generated wrapper the way `cmd.exe` would for the tiny subset
/// the tests use: `echo <text>` and `exit <code>` / `exit /b <code>`.
fn run_wrapper_script(wrapper: &Path) -> Result<ToolOutput, ToolError> {
    let Ok(wrapper_src) = std::fs::read_to_string(wrapper) else {
        return FakeHost::exit(1, "The system cannot find the file specified.");
    };
    let dir = wrapper.parent().unwrap_or(Path::new("."));
    let call_line = wrapper_src
        .lines()
        .find(|l| l.starts_with("call "))
        .unwrap_or_default();
    let mut parts = call_line.split_whitespace();
    let _call = parts.next();
    let inner = parts.next().unwrap_or_default().trim_matches('"');
    let _redirect = parts.next();
    let log_name = parts.next().unwrap_or_default();

    let inner_src = std::fs::read_to_string(inner).unwrap_or_default();
    let mut log = String::new();
    let mut exit_code = 0;
    for line in inner_src.split("\r\n").filter(|l| !l.is_empty()) {
        if let Some(text) = line.strip_prefix("echo ") {
            log.push_str(text);
            log.push_str("\r\n");
        } else if let Some(code) = line
            .strip_prefix("exit /b ")
            .or_else(|| line.strip_prefix("exit "))
        {
            exit_code = code.trim().parse().unwrap_or(1);
            break;
        }
    }
    let _ = std::fs::write(dir.join(log_name), log);
    Ok(ToolOutput {
        stdout: String::new(),
        stderr: format!("cmd exited on host with error code {}.", exit_code),
        exit_code,
    })
}

impl HostTools for FakeHost {
    fn run(&self, invocation: &ToolInvocation, timeout: Duration) -> Result<ToolOutput, ToolError> {
        let call = Call {
            program: invocation.program_name(),
            args: invocation
                .exposed_args()
                .into_iter()
                .map(str::to_string)
                .collect(),
        };
        let mut state = self.state.borrow_mut();
        state.calls.push(call.clone());
        let injected = state.fail_rules.iter().find_map(|rule| rule(&call));
        match injected {
            Some(Failure::Exit(code)) => FakeHost::exit(code, "injected failure"),
            Some(Failure::Spawn) => Err(ToolError::Spawn {
                program: call.program,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            }),
            Some(Failure::Timeout) => Err(ToolError::Timeout {
                program: call.program,
                secs: timeout.as_secs(),
            }),
            None => Self::interpret(&mut state, &call),
        }
    }
}
