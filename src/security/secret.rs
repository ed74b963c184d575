//! Signing secret validation.
//!
//! # Responsibilities
//! - Classify the configured token secret (missing, well-known default, short, ok)
//! - Enforce the production policy: anything but a real secret is fatal
//! - Report insecure secrets as `Ok(false)` outside production
//!
//! # Design Decisions
//! - The validator is a trait so the bootstrap can run without one and tests
//!   can inject failing validators
//! - An unset secret is treated like the development fallback value

use crate::config::AuthConfig;

/// Secret used when `JWT_SECRET_KEY` is unset. Never accepted in strict mode.
pub const DEVELOPMENT_SECRET: &str = "development-secret-change-me";

/// Well-known placeholder values that must never sign production tokens.
const KNOWN_DEFAULTS: &[&str] = &[
    DEVELOPMENT_SECRET,
    "change-me",
    "changeme",
    "secret",
    "your-secret-key",
    "dev-secret",
];

/// Why a secret was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecretError {
    #[error("JWT_SECRET_KEY is not set")]
    Missing,
    #[error("JWT_SECRET_KEY is set to a well-known default value")]
    InsecureDefault,
    #[error("JWT_SECRET_KEY is {len} bytes, at least {min} required")]
    TooShort { len: usize, min: usize },
    #[error("secret check failed: {0}")]
    Check(String),
}

/// Classification of a configured secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretStatus {
    Missing,
    Default,
    TooShort(usize),
    Configured,
}

/// Startup check for the signing secret.
pub trait SecretValidator: Send + Sync {
    /// Returns `Ok(true)` for a usable secret.
    ///
    /// In strict mode an insecure secret is an error. Otherwise it is
    /// reported as `Ok(false)` so the caller can warn and continue.
    fn ensure_secret_configured(&self, strict: bool) -> Result<bool, SecretError>;
}

/// Validator for the HS256 token secret.
#[derive(Debug, Clone)]
pub struct JwtSecretValidator {
    secret: Option<String>,
    min_len: usize,
}

impl JwtSecretValidator {
    pub fn new(secret: Option<String>, min_len: usize) -> Self {
        Self { secret, min_len }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.secret.clone(), config.min_secret_len)
    }

    pub fn status(&self) -> SecretStatus {
        match self.secret.as_deref().map(str::trim) {
            None | Some("") => SecretStatus::Missing,
            Some(s) if KNOWN_DEFAULTS.iter().any(|d| d.eq_ignore_ascii_case(s)) => {
                SecretStatus::Default
            }
            Some(s) if s.len() < self.min_len => SecretStatus::TooShort(s.len()),
            Some(_) => SecretStatus::Configured,
        }
    }
}

impl SecretValidator for JwtSecretValidator {
    fn ensure_secret_configured(&self, strict: bool) -> Result<bool, SecretError> {
        match (self.status(), strict) {
            (SecretStatus::Configured, _) => Ok(true),
            (SecretStatus::Missing, true) => Err(SecretError::Missing),
            (SecretStatus::Default, true) => Err(SecretError::InsecureDefault),
            (SecretStatus::TooShort(len), true) => Err(SecretError::TooShort {
                len,
                min: self.min_len,
            }),
            (_, false) => Ok(false),
        }
    }
}

/// Secret used to sign and verify tokens: the configured one, or the
/// development fallback when unset.
pub fn signing_secret(config: &AuthConfig) -> &str {
    config
        .secret
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(DEVELOPMENT_SECRET)
}
