//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use crate::config::schema::{AppConfig, Environment};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable holding the environment mode.
pub const ENV_MODE_VAR: &str = "APP_ENV";
/// Environment variable holding the token signing secret.
pub const SECRET_VAR: &str = "JWT_SECRET_KEY";
/// Environment variable holding the locale.
pub const LOCALE_VAR: &str = "LANG";
/// Environment variable holding the publishable payments key.
pub const PUBLISHABLE_KEY_VAR: &str = "STRIPE_PUBLISHABLE_KEY";
pub const BIND_ADDRESS_VAR: &str = "BIND_ADDRESS";
pub const ADMIN_KEY_VAR: &str = "ADMIN_API_KEY";
pub const DISABLED_FEATURES_VAR: &str = "FEATURES_DISABLED";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply process environment
/// overrides and validate the result.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    load_config_with(path, |key| std::env::var(key).ok())
}

/// Same as [`load_config`] with an explicit variable lookup.
pub fn load_config_with<F>(path: Option<&Path>, lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => AppConfig::default(),
    };

    apply_env_overrides(&mut config, lookup);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables on top of file values.
///
/// Empty values count as unset, except for the secret which the validator
/// must see as configured-but-empty.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(mode) = lookup(ENV_MODE_VAR) {
        config.environment = Environment::parse(&mode);
    }
    if let Some(secret) = lookup(SECRET_VAR) {
        config.auth.secret = Some(secret);
    }
    if let Some(locale) = non_empty(LOCALE_VAR) {
        config.i18n.locale = Some(locale);
    }
    if let Some(key) = non_empty(PUBLISHABLE_KEY_VAR) {
        config.payments.publishable_key = Some(key);
    }
    if let Some(addr) = non_empty(BIND_ADDRESS_VAR) {
        config.listener.bind_address = addr;
    }
    if let Some(key) = non_empty(ADMIN_KEY_VAR) {
        config.admin.api_key = Some(key);
    }
    if let Some(list) = non_empty(DISABLED_FEATURES_VAR) {
        config.features.disabled = list
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let config = load_config_with(
            None,
            env(&[
                ("APP_ENV", "production"),
                ("JWT_SECRET_KEY", "s3cr3t"),
                ("LANG", "es_ES.UTF-8"),
                ("FEATURES_DISABLED", "chat, review,"),
            ]),
        )
        .unwrap();

        assert!(config.environment.is_production());
        assert_eq!(config.auth.secret.as_deref(), Some("s3cr3t"));
        assert_eq!(config.i18n.locale.as_deref(), Some("es_ES.UTF-8"));
        assert_eq!(config.features.disabled, vec!["chat", "review"]);
        assert!(config.payments.publishable_key.is_none());
    }

    #[test]
    fn test_file_then_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "environment = \"staging\"\n[listener]\nbind_address = \"127.0.0.1:9000\"\n[payments]\npublishable_key = \"pk_file\""
        )
        .unwrap();

        let config =
            load_config_with(Some(file.path()), env(&[("STRIPE_PUBLISHABLE_KEY", "pk_env")]))
                .unwrap();

        assert_eq!(config.environment, Environment::Other("staging".into()));
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.payments.publishable_key.as_deref(), Some("pk_env"));
    }

    #[test]
    fn test_invalid_bind_address_rejected() {
        let err = load_config_with(None, env(&[("BIND_ADDRESS", "not-an-address")])).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("bind_address"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config_with(Some(Path::new("/nonexistent/portal.toml")), env(&[]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
