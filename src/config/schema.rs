//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the portal.
//! All types derive Serde traits for deserialization from config files.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Publishable key rendered by the payments demo page when none is configured.
pub const PLACEHOLDER_PUBLISHABLE_KEY: &str = "pk_test_XXXXXXXXXXXXXXXXXXXXXXXX";

/// Root configuration for the portal server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Environment mode, decides secret validation strictness.
    pub environment: Environment,

    /// Listener configuration (bind address, timeouts).
    pub listener: ListenerConfig,

    /// Authentication secret and token settings.
    pub auth: AuthConfig,

    /// Localization defaults.
    pub i18n: I18nConfig,

    /// Payments settings (publishable key only).
    pub payments: PaymentsConfig,

    /// Chat feature limits.
    pub chat: ChatConfig,

    /// Feature toggles.
    pub features: FeaturesConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// Environment mode. Only `production` enables strict validation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum Environment {
    Production,
    #[default]
    Development,
    Other(String),
}

impl Environment {
    /// Parse a raw environment flag. Matching is trimmed and case-insensitive.
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "production" => Environment::Production,
            "" | "development" => Environment::Development,
            _ => Environment::Other(normalized),
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Environment::Production => "production",
            Environment::Development => "development",
            Environment::Other(name) => name,
        }
    }
}

impl From<String> for Environment {
    fn from(raw: String) -> Self {
        Environment::parse(&raw)
    }
}

impl From<Environment> for String {
    fn from(env: Environment) -> Self {
        env.as_str().to_string()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 signing secret (`JWT_SECRET_KEY`).
    pub secret: Option<String>,

    /// Minimum secret length accepted in strict mode.
    pub min_secret_len: usize,

    /// Lifetime of issued tokens in seconds.
    pub token_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: None,
            min_secret_len: 32,
            token_ttl_secs: 3600,
        }
    }
}

/// Localization configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct I18nConfig {
    /// Raw locale value (`LANG`), e.g. "es_ES.UTF-8".
    pub locale: Option<String>,
}

/// Payments configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PaymentsConfig {
    /// Publishable (non-secret) key exposed to the browser.
    pub publishable_key: Option<String>,
}

impl PaymentsConfig {
    /// Configured key or the documented placeholder.
    pub fn publishable_key_or_placeholder(&self) -> &str {
        self.publishable_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .unwrap_or(PLACEHOLDER_PUBLISHABLE_KEY)
    }
}

/// Chat feature configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Messages kept per room; older messages are dropped.
    pub max_history: usize,

    /// Maximum message length in characters.
    pub max_message_len: usize,

    /// Rooms held at once; posting to a new room beyond this is refused.
    pub max_rooms: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_history: 200,
            max_message_len: 2000,
            max_rooms: 1000,
        }
    }
}

/// Feature toggles.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FeaturesConfig {
    /// Feature names that are skipped without being probed.
    pub disabled: Vec<String>,
}

impl FeaturesConfig {
    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled.iter().any(|d| d.eq_ignore_ascii_case(name))
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Install the Prometheus recorder at startup.
    pub metrics_enabled: bool,

    /// Force JSON log output. Defaults to JSON in production.
    pub json_logs: Option<bool>,

    /// Interval between SSE heartbeat events in seconds.
    pub heartbeat_secs: u64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            json_logs: None,
            heartbeat_secs: 15,
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AdminConfig {
    /// Bearer key for `/admin/*`. Admin routes are not mounted without one.
    pub api_key: Option<String>,
}
