//! Portal server library.
//!
//! A web application whose optional subsystems (authentication, payments,
//! organizations, chat, review, streaming) are registered independently at
//! startup, behind a fail-fast check of the token signing secret.

pub mod admin;
pub mod config;
pub mod features;
pub mod http;
pub mod i18n;
pub mod lifecycle;
pub mod observability;
pub mod security;
pub mod templates;

pub use config::schema::AppConfig;
pub use http::HttpServer;
pub use lifecycle::{initialize, App, AppBuilder, Shutdown, StartupError};
