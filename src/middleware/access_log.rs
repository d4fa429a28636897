//! Access logging on tower-http's `TraceLayer`.
//!
//! The span is built from the [`RequestContext`] left by earlier stages, so
//! every event logged while serving a request carries its id and client IP.
//! One `info!` per request reports status and latency; 5xx responses are also
//! reported as failures by the default classifier.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultOnRequest, TraceLayer};
use tracing::{Span, info, info_span};

use super::context::RequestContext;

type MakeAccessSpan = fn(&Request<Body>) -> Span;
type OnAccessResponse = fn(&Response<Body>, Duration, &Span);

pub type AccessLogLayer = TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    MakeAccessSpan,
    DefaultOnRequest,
    OnAccessResponse,
>;

/// Must sit after the request identifier and IP resolver.
pub fn access_log() -> AccessLogLayer {
    TraceLayer::new_for_http()
        .make_span_with(access_span as MakeAccessSpan)
        .on_response(log_completion as OnAccessResponse)
}

fn access_span(req: &Request<Body>) -> Span {
    let ctx = RequestContext::of(req.extensions());
    info_span!(
        "access",
        method = %req.method(),
        path = %req.uri().path(),
        request_id = %ctx.request_id,
        client_ip = ?ctx.client_ip,
    )
}

fn log_completion(response: &Response<Body>, latency: Duration, _span: &Span) {
    info!(
        status = response.status().as_u16(),
        latency_ms = latency.as_secs_f64() * 1000.0,
        "Request completed"
    );
}
