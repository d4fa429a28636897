//! Bearer token authentication.
//!
//! Authentication is split in two:
//!
//! - [`AuthContextLayer`] runs globally. It reads `Authorization: Bearer <token>`
//!   and, if the token validates, attaches an [`Identity`] to the request
//!   context. It never rejects: a missing or bad token just leaves the
//!   request anonymous.
//! - [`require_auth`] and [`require_admin`] are per-route gates that reject
//!   anonymous (401) or under-privileged (403) callers before the handler runs.
//!
//! ```bash
//! curl -H "Authorization: Bearer $TOKEN" http://localhost:3000/v1/issues
//! ```

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::Request;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Response};
use axum::middleware::Next;
use tower::{Layer, Service};
use tracing::{debug, warn};

use super::context::{Identity, RequestContext};
use crate::auth::{Permissions, token};
use crate::error::AppError;

const BEARER_PREFIX: &str = "Bearer ";

/// Token in the `Authorization` header, if it uses the bearer scheme.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix(BEARER_PREFIX)?.trim();
    (!token.is_empty()).then_some(token)
}

#[derive(Clone)]
pub struct AuthContextLayer {
    secret: Arc<str>,
}

impl AuthContextLayer {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: Arc::from(secret),
        }
    }
}

impl<S> Layer<S> for AuthContextLayer {
    type Service = AuthContextService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthContextService {
            inner,
            secret: self.secret.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthContextService<S> {
    inner: S,
    secret: Arc<str>,
}

impl<S> Service<Request<Body>> for AuthContextService<S>
where
    S: Service<Request<Body>, Response = Response<Body>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        if let Some(raw) = bearer_token(req.headers()) {
            match token::validate(raw, &self.secret) {
                Ok((user_id, permissions)) => {
                    RequestContext::update(req.extensions_mut(), |ctx| {
                        ctx.with_identity(Identity {
                            user_id,
                            permissions,
                        })
                    });
                }
                Err(e) => debug!(error = %e, "Ignoring invalid bearer token"),
            }
        }

        self.inner.call(req)
    }
}

/// Reject requests without an authenticated caller.
pub async fn require_auth(req: Request, next: Next) -> Result<Response<Body>, AppError> {
    if RequestContext::of(req.extensions()).identity.is_none() {
        return Err(AppError::Unauthenticated(
            "authentication required".to_string(),
        ));
    }
    Ok(next.run(req).await)
}

/// Reject callers whose permissions lack [`Permissions::ADMIN`].
pub async fn require_admin(req: Request, next: Next) -> Result<Response<Body>, AppError> {
    let ctx = RequestContext::of(req.extensions());
    if !ctx.permissions().has(Permissions::ADMIN) {
        warn!(
            user_id = ?ctx.identity.map(|i| i.user_id),
            path = %req.uri().path(),
            "Admin access denied"
        );
        return Err(AppError::Forbidden("admin access required".to_string()));
    }
    Ok(next.run(req).await)
}
