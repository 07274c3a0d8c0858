//! The sandbox identity: account name, home directory and credential.
//!
//! Names are `<prefix><epoch seconds>`. The reaper of a later run matches on
//! the prefix alone, so this format must not change between releases.

use std::path::{Path, PathBuf};

use chrono::Utc;
use taskuser_core::config::MAX_ACCOUNT_NAME_LEN;

use crate::credential::Credential;

/// The active ephemeral account. Built once by the provisioner and read-only
/// afterwards; there are no setters.
#[derive(Debug, Clone)]
pub struct SandboxIdentity {
    name: String,
    home_dir: PathBuf,
    credential: Credential,
}

impl SandboxIdentity {
    pub(crate) fn new(name: String, home_dir: PathBuf, credential: Credential) -> Self {
        Self {
            name,
            home_dir,
            credential,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn home_dir(&self) -> &Path {
        &self.home_dir
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }
}

/// Account name for an identity created at `epoch_secs`.
///
/// Bounded to the host's account-name limit; a validated prefix always fits
/// in full together with a 10-digit timestamp.
pub fn identity_name(prefix: &str, epoch_secs: i64) -> String {
    format!("{}{}", prefix, epoch_secs)
        .chars()
        .take(MAX_ACCOUNT_NAME_LEN)
        .collect()
}

/// Account name for an identity created now.
pub fn identity_name_now(prefix: &str) -> String {
    identity_name(prefix, Utc::now().timestamp())
}

/// Whether an account or directory name belongs to a sandbox identity.
pub fn is_sandbox_name(prefix: &str, candidate: &str) -> bool {
    !prefix.is_empty() && candidate.starts_with(prefix)
}

/// Home directory of the named identity.
pub fn home_dir_for(home_root: &Path, name: &str) -> PathBuf {
    home_root.join(name)
}
