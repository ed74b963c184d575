//! Authentication feature: session tokens signed with `JWT_SECRET_KEY`.
//!
//! Routes:
//! - `GET /auth/session` verifies the bearer token and returns its claims
//! - `POST /auth/token` issues a token (outside production only)

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::features::{Feature, FeatureContext, FeatureError};
use crate::http::response::ApiError;
use crate::security::secret::signing_secret;
use crate::security::token::{issue_token, verify_token, TokenError};

pub struct AuthFeature;

#[derive(Clone)]
struct AuthState {
    secret: Arc<str>,
    ttl_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub subject: String,
    #[serde(default)]
    pub locale: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub expires_in: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub subject: String,
    pub expires_at: u64,
    pub locale: Option<String>,
}

impl Feature for AuthFeature {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn routes(&self, ctx: &FeatureContext) -> Result<Router, FeatureError> {
        let auth = &ctx.config.auth;
        if auth.token_ttl_secs == 0 {
            return Err(FeatureError::Misconfigured {
                field: "auth.token_ttl_secs",
                reason: "must be greater than zero".into(),
            });
        }

        let state = AuthState {
            secret: Arc::from(signing_secret(auth)),
            ttl_secs: auth.token_ttl_secs,
        };

        let mut router = Router::new().route("/auth/session", get(session));
        if !ctx.config.environment.is_production() {
            router = router.route("/auth/token", post(token));
        }
        Ok(router.with_state(state))
    }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

async fn session(
    State(state): State<AuthState>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, ApiError> {
    let token = bearer(&headers).ok_or(ApiError::Unauthorized)?;
    let claims = verify_token(&state.secret, token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected session token");
        ApiError::Unauthorized
    })?;

    Ok(Json(SessionResponse {
        subject: claims.sub,
        expires_at: claims.exp,
        locale: claims.locale,
    }))
}

async fn token(
    State(state): State<AuthState>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = issue_token(&state.secret, &req.subject, req.locale, state.ttl_secs).map_err(
        |e| match e {
            TokenError::EmptySubject => ApiError::BadRequest(e.to_string()),
            TokenError::Jwt(e) => ApiError::Internal(e.to_string()),
        },
    )?;

    tracing::info!(subject = %req.subject, "Issued development token");
    Ok(Json(TokenResponse {
        token,
        expires_in: state.ttl_secs,
    }))
}
