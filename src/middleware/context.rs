//! Per-request context shared between pipeline stages and handlers.
//!
//! Stages never mutate the context in place: each one takes the current
//! value out of the request extensions, layers its field on with a
//! `with_*` method and stores the new value back.

use std::convert::Infallible;
use std::net::IpAddr;

use axum::extract::FromRequestParts;
use axum::http::Extensions;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::auth::Permissions;
use crate::error::AppError;

/// An authenticated caller. Id and permissions always travel together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub permissions: Permissions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: String,
    pub client_ip: Option<IpAddr>,
    pub identity: Option<Identity>,
}

impl RequestContext {
    pub fn with_request_id(self, request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            ..self
        }
    }

    pub fn with_client_ip(self, client_ip: IpAddr) -> Self {
        Self {
            client_ip: Some(client_ip),
            ..self
        }
    }

    pub fn with_identity(self, identity: Identity) -> Self {
        Self {
            identity: Some(identity),
            ..self
        }
    }

    /// Permissions of the caller, or none when unauthenticated.
    pub fn permissions(&self) -> Permissions {
        self.identity
            .map(|i| i.permissions)
            .unwrap_or(Permissions::NONE)
    }

    /// Current context of a request; a missing one reads as empty.
    pub fn of(extensions: &Extensions) -> Self {
        extensions.get::<Self>().cloned().unwrap_or_default()
    }

    /// Replace the context stored in `extensions` with `f(current)`.
    pub fn update(extensions: &mut Extensions, f: impl FnOnce(Self) -> Self) {
        let current = extensions.remove::<Self>().unwrap_or_default();
        extensions.insert(f(current));
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::of(&parts.extensions))
    }
}

/// Extractor for handlers that need a caller; rejects with 401 otherwise.
///
/// Routes are also gated by `require_auth`, so the rejection is a backstop.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Identity);

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .and_then(|ctx| ctx.identity)
            .map(AuthUser)
            .ok_or_else(|| AppError::Unauthenticated("authentication required".to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn test_builders_keep_other_fields() {
        let identity = Identity {
            user_id: Uuid::new_v4(),
            permissions: Permissions::DEFAULT,
        };
        let ctx = RequestContext::default()
            .with_request_id("abc")
            .with_client_ip("203.0.113.7".parse().unwrap())
            .with_identity(identity);

        assert_eq!(ctx.request_id, "abc");
        assert_eq!(ctx.client_ip, Some("203.0.113.7".parse().unwrap()));
        assert_eq!(ctx.identity, Some(identity));
        assert_eq!(ctx.permissions(), Permissions::DEFAULT);
    }

    #[test]
    fn test_missing_context_is_unauthenticated() {
        let extensions = Extensions::new();
        let ctx = RequestContext::of(&extensions);
        assert!(ctx.identity.is_none());
        assert_eq!(ctx.permissions(), Permissions::NONE);
    }

    #[test]
    fn test_update_replaces_value() {
        let mut extensions = Extensions::new();
        RequestContext::update(&mut extensions, |c| c.with_request_id("one"));
        RequestContext::update(&mut extensions, |c| {
            c.with_client_ip("10.1.2.3".parse().unwrap())
        });

        let ctx = RequestContext::of(&extensions);
        assert_eq!(ctx.request_id, "one");
        assert!(ctx.client_ip.is_some());
    }

    #[tokio::test]
    async fn test_auth_user_rejects_without_identity() {
        let (mut parts, _) = Request::new(()).into_parts();
        let result = AuthUser::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AppError::Unauthenticated(_))));
    }
}
