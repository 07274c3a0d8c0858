//! Credential generator for sandbox accounts.
//!
//! The random part is drawn from `[A-Za-z0-9]` only, so the secret survives
//! `net user` and command-line quoting unchanged. The fixed `pWd0_` marker
//! guarantees one lowercase, one uppercase, one digit and one special
//! character for hosts with a strict password policy. 24 random characters
//! give 62^24 (about 143 bits) possibilities. The OS RNG is used, so values
//! are never reproducible.

use std::fmt;

use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use zeroize::Zeroizing;

pub const CREDENTIAL_MARKER: &str = "pWd0_";
pub const RANDOM_LEN: usize = 24;
pub const CREDENTIAL_LEN: usize = CREDENTIAL_MARKER.len() + RANDOM_LEN;

/// Secret for the sandbox account. Wiped from memory on drop and never
/// printed by `Debug` or `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(Zeroizing<String>);

impl Credential {
    /// Generate a fresh credential.
    pub fn generate() -> Self {
        let random: String = OsRng
            .sample_iter(&Alphanumeric)
            .take(RANDOM_LEN)
            .map(char::from)
            .collect();
        let mut secret = String::with_capacity(CREDENTIAL_LEN);
        secret.push_str(CREDENTIAL_MARKER);
        secret.push_str(&random);
        Self(Zeroizing::new(secret))
    }

    /// The raw secret, for the account-creation and exec-tool arguments only.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(********)")
    }
}

/// Length and character-class policy every generated credential satisfies.
pub fn meets_policy(secret: &str) -> bool {
    secret.len() >= CREDENTIAL_LEN
        && secret.chars().any(|c| c.is_ascii_lowercase())
        && secret.chars().any(|c| c.is_ascii_uppercase())
        && secret.chars().any(|c| c.is_ascii_digit())
        && secret.contains('_')
        && secret
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}
