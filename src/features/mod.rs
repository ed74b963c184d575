//! Optional feature modules.
//!
//! # Data Flow
//! ```text
//! FeatureRegistry (fixed order)
//!     → Feature::routes(&FeatureContext)   probe capabilities, build routing unit
//!     → lifecycle::startup merges the unit or records the failure
//! ```
//!
//! # Design Decisions
//! - Each feature owns its state and returns a fully stated `Router`
//! - Probing and building happen in one call; a missing capability is an
//!   `Err`, never a panic
//! - Features never declare overlapping paths; each lives under its own prefix

pub mod auth;
pub mod chat;
pub mod organizations;
pub mod payments;
pub mod review;
pub mod streaming;

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::AppConfig;
use crate::templates::Renderer;

pub use auth::AuthFeature;
pub use chat::ChatFeature;
pub use organizations::OrganizationsFeature;
pub use payments::PaymentsFeature;
pub use review::ReviewFeature;
pub use streaming::StreamingFeature;

/// Shared inputs available to every feature while it builds its routes.
#[derive(Clone)]
pub struct FeatureContext {
    pub config: Arc<AppConfig>,
    pub renderer: Arc<Renderer>,
    /// Present when a Prometheus recorder is available.
    pub metrics: Option<PrometheusHandle>,
}

impl fmt::Debug for FeatureContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureContext")
            .field("environment", &self.config.environment)
            .field("renderer", &self.renderer)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

/// Why a feature could not provide its routes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeatureError {
    #[error("capability unavailable: {0}")]
    Unavailable(String),
    #[error("invalid setting {field}: {reason}")]
    Misconfigured { field: &'static str, reason: String },
    #[error("panicked during registration: {0}")]
    Panicked(String),
}

/// A feature module that can contribute a routing unit.
pub trait Feature: Send + Sync {
    /// Stable name used in logs, metrics and `features.disabled`.
    fn name(&self) -> &'static str;

    /// Probe capabilities and build the routing unit.
    fn routes(&self, ctx: &FeatureContext) -> Result<Router, FeatureError>;
}

/// Ordered list of features probed at startup.
#[derive(Default)]
pub struct FeatureRegistry {
    features: Vec<Box<dyn Feature>>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in features in registration order.
    pub fn builtin() -> Self {
        Self::new()
            .with(AuthFeature)
            .with(PaymentsFeature)
            .with(OrganizationsFeature)
            .with(ChatFeature)
            .with(ReviewFeature)
            .with(StreamingFeature)
    }

    pub fn with<F: Feature + 'static>(mut self, feature: F) -> Self {
        self.features.push(Box::new(feature));
        self
    }

    /// Replace the feature with the same name, keeping its position.
    pub fn replace<F: Feature + 'static>(mut self, feature: F) -> Self {
        match self.features.iter().position(|f| f.name() == feature.name()) {
            Some(idx) => self.features[idx] = Box::new(feature),
            None => self.features.push(Box::new(feature)),
        }
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.features.iter().map(|f| f.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Feature> {
        self.features.iter().map(|f| f.as_ref())
    }
}

impl fmt::Debug for FeatureRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Seconds since the Unix epoch.
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
