//! Admin API.
//!
//! Read-only endpoints describing how the server booted. Mounted only when
//! an admin key is configured; every route requires `Authorization: Bearer <key>`.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::lifecycle::startup::StartupReport;

#[derive(Clone)]
pub struct AdminState {
    pub api_key: Arc<str>,
    pub report: Arc<StartupReport>,
}

pub fn setup_admin_router(api_key: &str, report: Arc<StartupReport>) -> Router {
    let state = AdminState {
        api_key: Arc::from(api_key),
        report,
    };
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/features", get(get_features))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
