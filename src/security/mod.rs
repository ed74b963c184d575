//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     AuthConfig → secret.rs (classify, enforce per environment policy)
//!
//! Requests (auth feature):
//!     Authorization: Bearer <jwt> → token.rs (verify HS256, expiry) → Claims
//! ```
//!
//! # Design Decisions
//! - Fail closed in production: an insecure secret aborts startup
//! - Development keeps working with a fallback secret and a warning

pub mod secret;
pub mod token;

pub use secret::{JwtSecretValidator, SecretError, SecretValidator};
pub use token::{issue_token, verify_token, Claims, TokenError};
