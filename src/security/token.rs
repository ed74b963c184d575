//! HS256 session tokens.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Claims carried by portal session tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user identifier).
    pub sub: String,
    /// Issued at, seconds since epoch.
    pub iat: u64,
    /// Expiry, seconds since epoch.
    pub exp: u64,
    /// Preferred locale requested at issue time, reported by `/auth/session`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token subject must not be empty")]
    EmptySubject,
    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Sign a token for `subject` valid for `ttl_secs`.
pub fn issue_token(
    secret: &str,
    subject: &str,
    locale: Option<String>,
    ttl_secs: u64,
) -> Result<String, TokenError> {
    if subject.trim().is_empty() {
        return Err(TokenError::EmptySubject);
    }
    let iat = now_secs();
    let claims = Claims {
        sub: subject.to_string(),
        iat,
        exp: iat + ttl_secs,
        locale,
    };
    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

/// Verify signature and expiry, returning the claims.
pub fn verify_token(secret: &str, token: &str) -> Result<Claims, TokenError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(data.claims)
}
