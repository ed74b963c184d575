//! Payments feature: browser-side configuration for the payment widget.
//!
//! Only the publishable key is handled here. Charging, webhooks and the secret
//! key belong to the payment provider integration.

use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use crate::config::PLACEHOLDER_PUBLISHABLE_KEY;
use crate::features::{Feature, FeatureContext, FeatureError};

pub struct PaymentsFeature;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentsClientConfig {
    pub publishable_key: String,
    /// True when the documented placeholder is in use.
    pub placeholder: bool,
}

impl Feature for PaymentsFeature {
    fn name(&self) -> &'static str {
        "payments"
    }

    fn routes(&self, ctx: &FeatureContext) -> Result<Router, FeatureError> {
        let key = ctx.config.payments.publishable_key_or_placeholder();
        if key.starts_with("sk_") {
            return Err(FeatureError::Misconfigured {
                field: "payments.publishable_key",
                reason: "a secret key must never be exposed to browsers".into(),
            });
        }

        let client_config = PaymentsClientConfig {
            publishable_key: key.to_string(),
            placeholder: key == PLACEHOLDER_PUBLISHABLE_KEY,
        };
        if client_config.placeholder {
            tracing::debug!("Payments using placeholder publishable key");
        }

        Ok(Router::new()
            .route("/payments/config", get(client_config_handler))
            .with_state(client_config))
    }
}

async fn client_config_handler(
    State(config): State<PaymentsClientConfig>,
) -> Json<PaymentsClientConfig> {
    Json(config)
}
