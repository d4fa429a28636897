//! Fixed CORS policy.
//!
//! Every response carries the same three `Access-Control-*` headers, and
//! every `OPTIONS` request is answered here with `204 No Content` without
//! reaching later stages or the router.

use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    HeaderMap, HeaderValue,
};
use axum::http::{Method, Request, Response, StatusCode};
use tower::{Layer, Service};
use tracing::debug;

use crate::error::{AppError, AppResult};

pub const ALLOWED_METHODS: &str = "GET, POST, PATCH, DELETE, OPTIONS";
pub const ALLOWED_HEADERS: &str = "Content-Type, Authorization";

#[derive(Clone)]
pub struct CorsPolicyLayer {
    origin: HeaderValue,
}

impl CorsPolicyLayer {
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if `origin` is not a valid header value.
    pub fn new(origin: &str) -> AppResult<Self> {
        let origin = HeaderValue::from_str(origin)
            .map_err(|e| AppError::ConfigError(format!("Invalid CORS_ORIGIN {origin:?}: {e}")))?;
        Ok(Self { origin })
    }
}

impl<S> Layer<S> for CorsPolicyLayer {
    type Service = CorsPolicyService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorsPolicyService {
            inner,
            origin: self.origin.clone(),
        }
    }
}

#[derive(Clone)]
pub struct CorsPolicyService<S> {
    inner: S,
    origin: HeaderValue,
}

fn apply_policy(origin: &HeaderValue, headers: &mut HeaderMap) {
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
}

impl<S> Service<Request<Body>> for CorsPolicyService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Error: Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        if req.method() == Method::OPTIONS {
            debug!(path = %req.uri().path(), "Answering CORS preflight");
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::NO_CONTENT;
            apply_policy(&self.origin, response.headers_mut());
            return Box::pin(std::future::ready(Ok(response)));
        }

        let origin = self.origin.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let mut response = inner.call(req).await?;
            apply_policy(&origin, response.headers_mut());
            Ok(response)
        })
    }
}
