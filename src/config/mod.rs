//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional config file (TOML) + process environment (.env aware)
//!     → loader.rs (parse, deserialize, apply env overrides)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → shared via Arc with the bootstrap and every feature
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup and never mutated
//! - All fields have defaults to allow running with no file at all
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_config_with, ConfigError};
pub use schema::{
    AdminConfig, AppConfig, AuthConfig, ChatConfig, Environment, FeaturesConfig, I18nConfig,
    ListenerConfig, ObservabilityConfig, PaymentsConfig, PLACEHOLDER_PUBLISHABLE_KEY,
};
