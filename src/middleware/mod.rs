//! HTTP middleware pipeline.
//!
//! Global stages, outermost first:
//!
//! ```text
//! Request → RequestId → CORS → PanicGuard → ClientIp → AccessLog → AuthContext → BodyTimeout → Deadline → Router
//!               ↓         ↓         ↓                                                 ↓            ↓
//!        X-Request-ID  204 for   500 JSON                                          400 JSON     504 JSON
//!                      OPTIONS
//! ```
//!
//! Per-route gates ([`require_auth`], [`require_admin`]) run inside the
//! router, after the deadline has started.
//!
//! Every stage communicates through the immutable [`RequestContext`] held in
//! request extensions.

pub mod access_log;
pub mod auth;
pub mod context;
pub mod cors;
pub mod ip;
pub mod panic;
pub mod pipeline;
pub mod request_id;
pub mod timeout;

pub use access_log::{AccessLogLayer, access_log};
pub use auth::{AuthContextLayer, require_admin, require_auth};
pub use context::{AuthUser, Identity, RequestContext};
pub use cors::CorsPolicyLayer;
pub use ip::{ClientIpLayer, TrustedProxies};
pub use panic::{install_panic_hook, panic_guard};
pub use pipeline::Pipeline;
pub use request_id::{REQUEST_ID_HEADER, RequestIdLayer};
pub use timeout::{Deadline, DeadlineLayer};
