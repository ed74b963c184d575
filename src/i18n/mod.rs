//! Localization.
//!
//! # Responsibilities
//! - Load the embedded translation catalogs
//! - Resolve the process locale from `LANG`-style values
//! - Translate keys with locale fallback
//!
//! # Design Decisions
//! - Catalogs are compiled in, so a missing file can never break startup
//! - Lookup order: requested locale, default locale, `en`, then the key itself

pub mod catalog;

use std::collections::HashMap;

use crate::config::I18nConfig;

pub use catalog::Catalog;

/// Locale used when nothing else matches.
pub const FALLBACK_LOCALE: &str = "en";

const EMBEDDED: &[(&str, &str)] = &[
    ("en", include_str!("../../locales/en.toml")),
    ("es", include_str!("../../locales/es.toml")),
];

/// Translation provider shared by every rendered page.
#[derive(Debug, Clone)]
pub struct Localizer {
    default_locale: String,
    catalogs: HashMap<String, Catalog>,
}

impl Localizer {
    /// Build a localizer whose default locale is resolved from `raw_locale`
    /// (e.g. the value of `LANG`).
    pub fn new(raw_locale: Option<&str>) -> Self {
        let mut catalogs = HashMap::new();
        for (locale, source) in EMBEDDED {
            match Catalog::parse(source) {
                Ok(catalog) => {
                    catalogs.insert(locale.to_string(), catalog);
                }
                Err(e) => tracing::error!(locale = %locale, error = %e, "Failed to parse catalog"),
            }
        }

        let mut localizer = Self {
            default_locale: FALLBACK_LOCALE.to_string(),
            catalogs,
        };
        localizer.default_locale = raw_locale
            .and_then(|raw| localizer.resolve(raw))
            .unwrap_or_else(|| FALLBACK_LOCALE.to_string());
        localizer
    }

    pub fn from_config(config: &I18nConfig) -> Self {
        Self::new(config.locale.as_deref())
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.catalogs.keys().map(String::as_str)
    }

    /// Map a raw value such as `es_ES.UTF-8` or `pt-BR` onto a loaded locale.
    pub fn resolve(&self, raw: &str) -> Option<String> {
        let base = raw
            .split(['.', '@'])
            .next()
            .unwrap_or_default()
            .trim()
            .replace('-', "_")
            .to_ascii_lowercase();
        if base.is_empty() {
            return None;
        }
        if self.catalogs.contains_key(&base) {
            return Some(base);
        }
        let language = base.split('_').next().unwrap_or_default();
        self.catalogs
            .contains_key(language)
            .then(|| language.to_string())
    }

    /// Translate `key`, falling back to the key itself when no catalog has it.
    pub fn t(&self, key: &str, locale: Option<&str>) -> String {
        let requested = locale.and_then(|l| self.resolve(l));
        let chain = requested
            .iter()
            .map(String::as_str)
            .chain([self.default_locale.as_str(), FALLBACK_LOCALE]);

        for candidate in chain {
            if let Some(text) = self.catalogs.get(candidate).and_then(|c| c.get(key)) {
                return text.to_string();
            }
        }
        key.to_string()
    }
}

impl Default for Localizer {
    fn default() -> Self {
        Self::new(None)
    }
}
