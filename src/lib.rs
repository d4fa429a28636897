//! # Issue Tracker
//!
//! A small issue-tracking REST API built on Axum, featuring:
//!
//! - **Accounts**: registration and login with Argon2id password hashes and
//!   HS256 bearer tokens carrying a permission bitmask
//! - **Issues**: create, list, read, update status, delete
//! - **Admin**: aggregate statistics behind an admin permission gate
//! - **Middleware pipeline**: request IDs, CORS, panic recovery, trusted-proxy
//!   client IP resolution, access logging, optional-then-required
//!   authentication and per-request deadlines with response buffering
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Pipeline (RequestId → CORS → Panic → IP → Log → Auth → ⏱)  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Router + per-route gates (require_auth, require_admin)     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Handlers (health, users, issues, admin)                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Storage (IssueRepository, UserRepository, AdminRepository) │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::net::SocketAddr;
//!
//! use issue_tracker::{AppState, Config, build_router};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let addr: SocketAddr = config.server_addr().parse()?;
//!     let app = build_router(AppState::in_memory(config))?;
//!
//!     let listener = tokio::net::TcpListener::bind(addr).await?;
//!     axum::serve(
//!         listener,
//!         app.into_make_service_with_connect_info::<SocketAddr>(),
//!     )
//!     .await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod json;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
pub mod validation;

// Re-exports for convenience
pub use config::Config;
pub use error::{AppError, AppResult};
pub use routes::build_router;
pub use state::AppState;
