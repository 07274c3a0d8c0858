//! Observability: tracing init and the JSONL audit log.
//!
//! Uses config::ObservabilityConfig for TASKUSER_QUIET, LOG_LEVEL, LOG_JSON and AUDIT_LOG.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use serde_json::json;
use tracing_subscriber::{prelude::*, EnvFilter};

static AUDIT_PATH: Mutex<Option<String>> = Mutex::new(None);

/// Initialize tracing. Call at process startup.
/// When TASKUSER_QUIET=1 only WARN and above are logged.
pub fn init_tracing() {
    let cfg = crate::config::ObservabilityConfig::from_env();
    let level: String = if cfg.quiet {
        "taskuser=warn".to_string()
    } else {
        cfg.log_level.clone()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let _ = if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
    };
}

fn get_audit_path() -> Option<String> {
    {
        let guard = AUDIT_PATH.lock().ok()?;
        if let Some(ref p) = *guard {
            return Some(p.clone());
        }
    }
    let path = crate::config::ObservabilityConfig::from_env()
        .audit_log
        .clone()?;
    if path.is_empty() {
        return None;
    }
    if let Some(parent) = Path::new(&path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    {
        let mut guard = AUDIT_PATH.lock().ok()?;
        *guard = Some(path.clone());
    }
    Some(path)
}

/// Append one JSON record as a line. Failures are swallowed: the audit log
/// must never break provisioning or task execution.
pub fn append_jsonl(path: &Path, record: &serde_json::Value) {
    if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(path) {
        if let Ok(line) = serde_json::to_string(record) {
            let _ = writeln!(f, "{}", line);
        }
    }
}

fn emit(record: serde_json::Value) {
    if let Some(path) = get_audit_path() {
        append_jsonl(Path::new(&path), &record);
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Audit: a stale account or home directory was (or failed to be) removed.
pub fn audit_identity_reaped(name: &str, kind: &str, ok: bool) {
    emit(json!({
        "ts": now(),
        "event": "identity_reaped",
        "name": name,
        "kind": kind,
        "ok": ok,
    }));
}

/// Audit: a new sandbox identity passed its liveness check.
pub fn audit_identity_provisioned(name: &str, home_dir: &str) {
    emit(json!({
        "ts": now(),
        "event": "identity_provisioned",
        "name": name,
        "home_dir": home_dir,
    }));
}

/// Audit: task scripts written, about to launch under the identity.
pub fn audit_task_launched(task_id: &str, identity: &str, wrapper: &str) {
    emit(json!({
        "ts": now(),
        "event": "task_launched",
        "task_id": task_id,
        "identity": identity,
        "wrapper": wrapper,
    }));
}

/// Audit: task process exited or was killed.
pub fn audit_task_completed(task_id: &str, exit_code: i32, duration_ms: u64, timed_out: bool) {
    emit(json!({
        "ts": now(),
        "event": "task_completed",
        "task_id": task_id,
        "exit_code": exit_code,
        "duration_ms": duration_ms,
        "timed_out": timed_out,
        "success": exit_code == 0 && !timed_out,
    }));
}
