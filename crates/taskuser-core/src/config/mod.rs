//! Configuration layer for taskuser.
//!
//! All environment reads live here; business code takes a `SandboxConfig` or
//! `ObservabilityConfig` and never calls `std::env::var` itself.
//!
//! - `loader`: fallback-chain readers (`env_or`, `env_optional`, `env_bool`, `env_u64`)
//! - `schema`: `SandboxConfig`, `ObservabilityConfig`, validation
//! - `env_keys`: key names

pub mod env_keys;
pub mod loader;
pub mod schema;

pub use loader::{
    env_bool, env_optional, env_or, env_u64, load_dotenv, remove_env_var, set_env_var,
    ScopedEnvGuard,
};
pub use schema::{
    ConfigError, ObservabilityConfig, SandboxConfig, DEFAULT_PREFIX, EPOCH_SECONDS_DIGITS,
    MAX_ACCOUNT_NAME_LEN,
};
