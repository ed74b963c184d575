//! Streaming & observability feature.
//!
//! Routes:
//! - `GET /observability/metrics` renders the Prometheus exposition
//! - `GET /observability/events` streams heartbeat events (SSE)

use std::time::{Duration, Instant};

use axum::{
    extract::State,
    http::header::CONTENT_TYPE,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::get,
    Router,
};
use futures_util::stream::{self, Stream};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;

use crate::features::{unix_now, Feature, FeatureContext, FeatureError};

pub struct StreamingFeature;

#[derive(Clone)]
struct StreamingState {
    metrics: PrometheusHandle,
    heartbeat: Duration,
    started: Instant,
}

#[derive(Debug, Serialize)]
struct Heartbeat {
    seq: u64,
    uptime_secs: u64,
    timestamp: u64,
}

impl Feature for StreamingFeature {
    fn name(&self) -> &'static str {
        "streaming"
    }

    fn routes(&self, ctx: &FeatureContext) -> Result<Router, FeatureError> {
        let metrics = ctx
            .metrics
            .clone()
            .ok_or_else(|| FeatureError::Unavailable("no metrics recorder installed".into()))?;

        let heartbeat_secs = ctx.config.observability.heartbeat_secs;
        if heartbeat_secs == 0 {
            return Err(FeatureError::Misconfigured {
                field: "observability.heartbeat_secs",
                reason: "must be greater than zero".into(),
            });
        }

        let state = StreamingState {
            metrics,
            heartbeat: Duration::from_secs(heartbeat_secs),
            started: Instant::now(),
        };

        Ok(Router::new()
            .route("/observability/metrics", get(render_metrics))
            .route("/observability/events", get(events))
            .with_state(state))
    }
}

async fn render_metrics(State(state): State<StreamingState>) -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

async fn events(
    State(state): State<StreamingState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    tracing::debug!("Event stream opened");
    Sse::new(heartbeats(state.heartbeat, state.started)).keep_alive(KeepAlive::default())
}

/// First heartbeat is sent immediately, then one per `interval`.
fn heartbeats(
    interval: Duration,
    started: Instant,
) -> impl Stream<Item = Result<Event, axum::Error>> {
    stream::unfold(0u64, move |seq| async move {
        if seq > 0 {
            tokio::time::sleep(interval).await;
        }
        let beat = Heartbeat {
            seq,
            uptime_secs: started.elapsed().as_secs(),
            timestamp: unix_now(),
        };
        let event = Event::default()
            .event("heartbeat")
            .id(seq.to_string())
            .json_data(beat);
        Some((event, seq + 1))
    })
}
