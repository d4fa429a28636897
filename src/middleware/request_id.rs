//! Request ID middleware for correlation across logs.
//!
//! # Features
//!
//! - Propagates a client supplied `X-Request-ID` header
//! - Generates a UUIDv4 when the header is missing, empty or not visible ASCII
//! - Stores the ID in [`RequestContext`] so handlers can read it
//! - Mirrors the ID onto every response
//! - Runs the rest of the pipeline inside a `request` span carrying the ID
//!
//! # Client Usage
//!
//! ```bash
//! curl -H "X-Request-ID: my-correlation-id" http://localhost:3000/v1/health
//! ```

use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::header::HeaderValue;
use axum::http::{Request, Response};
use tower::{Layer, Service};
use tracing::{Instrument, debug, info_span};
use uuid::Uuid;

use super::context::RequestContext;

/// Header name for request ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Fallback header value when a generated ID cannot be encoded.
static UNKNOWN_REQUEST_ID: HeaderValue = HeaderValue::from_static("unknown");

/// Request ID layer for Tower middleware stack.
#[derive(Clone, Default)]
pub struct RequestIdLayer;

impl RequestIdLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

/// Request ID service wrapper.
#[derive(Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for RequestIdService<S>
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

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let header = extract_or_generate_request_id(&req);
        let request_id = header.to_str().unwrap_or("unknown").to_string();

        RequestContext::update(req.extensions_mut(), |ctx| {
            ctx.with_request_id(request_id.clone())
        });

        let span = info_span!(
            "request",
            request_id = %request_id,
            method = %req.method(),
            path = %req.uri().path(),
        );
        debug!(parent: &span, "Processing request");

        let mut inner = self.inner.clone();

        Box::pin(
            async move {
                let mut response = inner.call(req).await?;
                response.headers_mut().insert(REQUEST_ID_HEADER, header);
                Ok(response)
            }
            .instrument(span),
        )
    }
}

/// Use the caller's request ID when it is usable, otherwise generate one.
fn extract_or_generate_request_id<B>(req: &Request<B>) -> HeaderValue {
    if let Some(value) = req.headers().get(REQUEST_ID_HEADER)
        && let Ok(text) = value.to_str()
        && !text.trim().is_empty()
    {
        return value.clone();
    }

    HeaderValue::from_str(&Uuid::new_v4().to_string())
        .unwrap_or_else(|_| UNKNOWN_REQUEST_ID.clone())
}
