//! HS256 bearer tokens.
//!
//! The subject is the user id; permissions travel in a custom claim so
//! the auth context loader never touches the user store.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::Permissions;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token could not be signed: {0}")]
    Signing(jsonwebtoken::errors::Error),

    #[error("token rejected: {0}")]
    Invalid(jsonwebtoken::errors::Error),

    #[error("token subject is not a user id: {0}")]
    Subject(#[from] uuid::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
    iat: i64,
    permissions: Permissions,
}

/// Issue a token for `user_id` expiring `ttl` from now.
pub fn generate(
    user_id: Uuid,
    permissions: Permissions,
    secret: &str,
    ttl: Duration,
) -> Result<String, TokenError> {
    let now = Utc::now().timestamp();
    let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
    let claims = Claims {
        sub: user_id.to_string(),
        exp: now.saturating_add(ttl_secs),
        iat: now,
        permissions,
    };
    sign(&claims, secret)
}

fn sign(claims: &Claims, secret: &str) -> Result<String, TokenError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(TokenError::Signing)
}

/// Verify signature, algorithm and expiry, returning the caller identity.
pub fn validate(token: &str, secret: &str) -> Result<(Uuid, Permissions), TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(TokenError::Invalid)?;

    let user_id = Uuid::parse_str(&data.claims.sub)?;
    Ok((user_id, data.claims.permissions))
}
