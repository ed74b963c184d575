//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wrap the composed [`App`] router with the middleware stack
//! - Wire up tracing, timeouts, request IDs and request metrics
//! - Serve on a bound listener until shutdown

use std::time::Duration;

use axum::{middleware, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::http::request::{make_request_span, propagate_request_id_layer, set_request_id_layer};
use crate::http::response::ApiError;
use crate::lifecycle::shutdown::triggered;
use crate::lifecycle::signals::shutdown_signal;
use crate::lifecycle::App;
use crate::observability::metrics;

/// HTTP server for the portal.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a server for a fully bootstrapped application.
    pub fn new(app: &App) -> Self {
        Self {
            router: Self::build_router(app),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(app: &App) -> Router {
        let timeout = Duration::from_secs(app.config().listener.request_timeout_secs);

        app.router()
            .fallback(not_found)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
                    .layer(propagate_request_id_layer())
                    .layer(middleware::from_fn(metrics::track_requests))
                    .layer(TimeoutLayer::new(timeout)),
            )
    }

    /// The routing table with middleware, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = shutdown_signal() => {},
                    _ = triggered(shutdown) => {},
                }
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn not_found() -> ApiError {
    ApiError::NotFound("route")
}
