//! Application routing configuration with middleware stack.
//!
//! # Middleware Stack (outermost first)
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │   Request ID     │ ← X-Request-ID on every response, tracing span
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │      CORS        │ ← 204 for every OPTIONS
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │   Panic Guard    │ ← 500 JSON on panic
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │    Client IP     │ ← trusted proxy resolution
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │   Access Log     │ ← TraceLayer span with request id + client IP
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │  Auth Context    │ ← optional bearer token
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │  Body Timeout    │ ← READ_TIMEOUT_SECS to receive the body
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │    Deadline      │ ← 504 JSON after REQUEST_TIMEOUT_SECS
//! └────────┬─────────┘
//!          ▼
//!   Router → per-route gates → Handler
//! ```
//!
//! # Route Groups
//!
//! - `/v1/health` - Liveness (public)
//! - `/v1/users/*` - Registration and login (public)
//! - `/v1/issues*` - Issue management (bearer token, except reading a single issue)
//! - `/v1/admin/*` - Admin statistics (bearer token with admin permission)

use axum::Router;
use axum::middleware::from_fn;
use axum::routing::{MethodRouter, delete, get, patch, post};
use tower_http::timeout::RequestBodyTimeoutLayer;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::handlers;
use crate::middleware::{
    AuthContextLayer, ClientIpLayer, CorsPolicyLayer, DeadlineLayer, Pipeline, RequestIdLayer,
    TrustedProxies, access_log, panic_guard, require_admin, require_auth,
};
use crate::state::AppState;

fn authenticated(route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.route_layer(from_fn(require_auth))
}

fn admin_only(route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn(require_auth))
}

async fn not_found() -> AppError {
    AppError::NotFound("resource not found".to_string())
}

/// Routes and per-route gates, without global middleware.
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/health", get(handlers::health_check))
        .route("/v1/users/register", post(handlers::register))
        .route("/v1/users/login", post(handlers::login))
        .route(
            "/v1/issues",
            authenticated(get(handlers::list_issues).post(handlers::create_issue)),
        )
        .route(
            "/v1/issues/{id}",
            get(handlers::get_issue).merge(authenticated(delete(handlers::delete_issue))),
        )
        .route(
            "/v1/issues/{id}/status",
            authenticated(patch(handlers::update_issue_status)),
        )
        .route("/v1/admin/stats", admin_only(get(handlers::stats)))
        // A known path with an unsupported method is still "no match"
        .method_not_allowed_fallback(not_found)
        .fallback(not_found)
}

/// The global pipeline, in the order requests pass through it.
///
/// # Errors
///
/// Returns `AppError::ConfigError` if `CORS_ORIGIN` is not a valid header value.
pub fn build_pipeline(state: &AppState) -> AppResult<Pipeline> {
    let config = &state.config;
    let trusted = TrustedProxies::new(&config.trusted_proxies);

    info!(
        cors_origin = %config.cors_origin,
        trusted_proxies = trusted.len(),
        request_timeout_secs = config.request_timeout.as_secs(),
        read_timeout_secs = config.read_timeout.as_secs(),
        "Configuring middleware pipeline"
    );

    Ok(Pipeline::new()
        .layer(RequestIdLayer::new())
        .layer(CorsPolicyLayer::new(&config.cors_origin)?)
        .layer(panic_guard())
        .layer(ClientIpLayer::new(trusted))
        .layer(access_log())
        .layer(AuthContextLayer::new(&config.jwt_secret))
        .layer(RequestBodyTimeoutLayer::new(config.read_timeout))
        .layer(DeadlineLayer::new(config.request_timeout)))
}

/// Build the application router with all routes and middleware configured.
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()` so the
/// client IP resolver can see the socket peer.
///
/// # Errors
///
/// Returns `AppError::ConfigError` if the middleware configuration is invalid.
pub fn build_router(state: AppState) -> AppResult<Router> {
    let pipeline = build_pipeline(&state)?;
    Ok(pipeline.wrap(api_routes().with_state(state)))
}
