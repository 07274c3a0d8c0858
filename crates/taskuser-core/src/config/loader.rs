//! Environment access for every `TASKUSER_*` setting.
//!
//! Values are read through one primary key plus optional legacy aliases
//! (e.g. `PSEXEC_PATH`); blank values never override a default.

use std::env;
use std::path::Path;

/// Load `./.env` once per process. Variables already set are left alone.
pub fn load_dotenv() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let path = env::current_dir()
            .map(|d| d.join(".env"))
            .unwrap_or_else(|_| std::path::PathBuf::from(".env"));
        for (key, value) in parse_dotenv_file(&path) {
            if env::var(&key).is_err() {
                set_env_var(&key, &value);
            }
        }
    });
}

/// `KEY=VALUE` pairs of a `.env` file; empty when the file is missing.
pub fn parse_dotenv_file(path: &Path) -> Vec<(String, String)> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_dotenv(&content),
        Err(_) => Vec::new(),
    }
}

fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(eq_pos) = line.find('=') else {
            continue;
        };
        let key = line[..eq_pos].trim();
        let mut value = line[eq_pos + 1..].trim();
        // Strip inline comment (# not inside quotes)
        if let Some(hash_pos) = value.find('#') {
            let before_hash = value[..hash_pos].trim_end();
            if !before_hash.contains('"') && !before_hash.contains('\'') {
                value = before_hash;
            }
        }
        if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            value = &value[1..value.len() - 1];
        }
        if !key.is_empty() {
            pairs.push((key.to_string(), value.to_string()));
        }
    }
    pairs
}

/// First non-blank value along `primary`, then `aliases` in order, trimmed.
///
/// A variable that is set but blank counts as unset, so an empty
/// `TASKUSER_EXEC_TOOL=` still falls through to `PSEXEC_PATH`.
fn lookup(primary: &str, aliases: &[&str]) -> Option<String> {
    std::iter::once(primary)
        .chain(aliases.iter().copied())
        .filter_map(|key| env::var(key).ok())
        .map(|raw| raw.trim().to_string())
        .find(|value| !value.is_empty())
}

/// Configured value, or `default()` when the whole chain is unset or blank.
pub fn env_or<F>(primary: &str, aliases: &[&str], default: F) -> String
where
    F: FnOnce() -> String,
{
    lookup(primary, aliases).unwrap_or_else(default)
}

/// Configured value, `None` when the whole chain is unset or blank.
pub fn env_optional(primary: &str, aliases: &[&str]) -> Option<String> {
    lookup(primary, aliases)
}

/// `0`, `false`, `no`, `off` (any case) are false; any other non-blank value is true.
pub fn env_bool(primary: &str, aliases: &[&str], default: bool) -> bool {
    match lookup(primary, aliases) {
        Some(value) => !matches!(
            value.to_ascii_lowercase().as_str(),
            "0" | "false" | "no" | "off"
        ),
        None => default,
    }
}

/// Unsigned integer setting. An unparsable value logs a warning and uses `default`.
pub fn env_u64(primary: &str, aliases: &[&str], default: u64) -> u64 {
    match lookup(primary, aliases) {
        Some(raw) => raw.parse::<u64>().unwrap_or_else(|_| {
            tracing::warn!("Invalid {}: {:?}, using default ({})", primary, raw, default);
            default
        }),
        None => default,
    }
}

// Mutation is confined to these wrappers. Call them before spawning threads.

/// Set one variable.
#[allow(unsafe_code)]
pub fn set_env_var(key: &str, value: &str) {
    unsafe { env::set_var(key, value) };
}

/// Remove one variable.
#[allow(unsafe_code)]
pub fn remove_env_var(key: &str) {
    unsafe { env::remove_var(key) };
}

/// Sets a variable and removes it again on drop. Used by tests.
pub struct ScopedEnvGuard(pub &'static str);

impl ScopedEnvGuard {
    pub fn set(key: &'static str, value: &str) -> Self {
        set_env_var(key, value);
        Self(key)
    }
}

impl Drop for ScopedEnvGuard {
    fn drop(&mut self) {
        remove_env_var(self.0);
    }
}
