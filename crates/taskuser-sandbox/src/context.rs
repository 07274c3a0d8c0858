//! Worker context: the process-wide sandbox identity and the host it lives on.
//!
//! Built once at worker startup and passed by reference to whatever runs
//! tasks. The identity is read-only after construction. Running a task
//! takes `&mut self`, so one context never has two tasks in flight against
//! the same home directory and log files.

use taskuser_core::config::SandboxConfig;

use crate::error::SandboxError;
use crate::host::HostTools;
use crate::identity::SandboxIdentity;
use crate::provisioner::provision_identity;
use crate::reaper::{reap_stale_identities, ReapReport};
use crate::runner::{execute_prepared, TaskOutcome};
use crate::wrapper::{wrap_task, PreparedCommand, TaskRun};

pub struct WorkerContext<H: HostTools> {
    config: SandboxConfig,
    host: H,
    identity: SandboxIdentity,
    reap_report: ReapReport,
}

impl<H: HostTools> WorkerContext<H> {
    /// Validate config, reap stale identities, then provision a fresh one.
    ///
    /// Reaping always completes and only collects warnings. Any
    /// provisioning failure is returned and no context is built.
    pub fn startup(config: SandboxConfig, host: H) -> Result<Self, SandboxError> {
        config.validate()?;
        let reap_report = reap_stale_identities(&host, &config);
        if !reap_report.warnings.is_empty() {
            tracing::warn!(
                "Stale identity cleanup finished with {} warning(s)",
                reap_report.warnings.len()
            );
        }
        let identity = provision_identity(&host, &config)?;
        Ok(Self {
            config,
            host,
            identity,
            reap_report,
        })
    }

    pub fn identity(&self) -> &SandboxIdentity {
        &self.identity
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// What the startup reaper removed and which warnings it raised.
    pub fn reap_report(&self) -> &ReapReport {
        &self.reap_report
    }

    /// Write the task's scripts and build its invocation without running it.
    pub fn prepare(&self, task: &TaskRun) -> Result<PreparedCommand, SandboxError> {
        wrap_task(&self.identity, &self.config, task)
    }

    /// Wrap and run one task with the configured task timeout.
    pub fn run_task(&mut self, task: &TaskRun) -> Result<TaskOutcome, SandboxError> {
        let prepared = self.prepare(task)?;
        self.run_prepared(&prepared)
    }

    /// Run an already prepared task (e.g. one carrying extra env vars).
    pub fn run_prepared(&mut self, prepared: &PreparedCommand) -> Result<TaskOutcome, SandboxError> {
        execute_prepared(&self.host, prepared, self.config.task_timeout())
    }
}
