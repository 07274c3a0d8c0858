//! Command registry: each subcommand registers a handler; `run_cli` only dispatches.

use std::sync::Arc;

use anyhow::Result;
use taskuser_core::config::SandboxConfig;

use crate::cli::Commands;

/// Handler: returns `Some(result)` if it owns the command, `None` otherwise.
pub type CommandHandler = Arc<dyn Fn(&Commands, SandboxConfig) -> Option<Result<()>> + Send + Sync>;

/// Tries handlers in registration order; the first `Some` wins.
pub struct CommandRegistry {
    handlers: Vec<CommandHandler>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn register<F>(&mut self, f: F)
    where
        F: Fn(&Commands, SandboxConfig) -> Option<Result<()>> + Send + Sync + 'static,
    {
        self.handlers.push(Arc::new(f));
    }

    pub fn dispatch(&self, cmd: &Commands, config: SandboxConfig) -> Result<()> {
        for h in &self.handlers {
            if let Some(r) = h(cmd, config.clone()) {
                return r;
            }
        }
        anyhow::bail!("no handler registered for {:?}", cmd)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
