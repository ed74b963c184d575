use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::lifecycle::startup::{RegistrationAttempt, SecretCheck};

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub status: String,
    pub environment: String,
    pub secret: SecretCheck,
    pub registered_features: Vec<String>,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let report = &state.report;
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "operational".to_string(),
        environment: report.environment.clone(),
        secret: report.secret.clone(),
        registered_features: report.registered().map(String::from).collect(),
    })
}

pub async fn get_features(State(state): State<AdminState>) -> Json<Vec<RegistrationAttempt>> {
    Json(state.report.attempts.clone())
}
