//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (assign request ID, request span)
//!     → App router (core pages, features, admin)
//!     → response.rs (JSON error mapping)
//!     → Send to client
//! ```

pub mod pages;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestIdExt, UuidRequestId, X_REQUEST_ID};
pub use response::ApiError;
pub use server::HttpServer;
