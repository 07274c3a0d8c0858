//! Progress lines for provisioning, reaping and task launch.
//!
//! `info_log!` emits at INFO through `tracing` and is dropped entirely when
//! `TASKUSER_QUIET` is set, so a worker fleet only records warnings and
//! errors. Warnings from the reaper and provisioning failures go through
//! `tracing::warn!`/`tracing::error!` directly and are never silenced.

#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {{
        if !$crate::log::is_quiet() {
            tracing::info!($($arg)*);
        }
    }};
}

/// Whether `TASKUSER_QUIET` suppresses progress lines.
pub fn is_quiet() -> bool {
    taskuser_core::config::ObservabilityConfig::from_env().quiet
}
