//! Request and response bodies for the HTTP API.
//!
//! Every success body keys its payload under a single name
//! (`issue`, `issues`, `user`, `stats`, `message`).

use serde::{Deserialize, Serialize};

use super::{AdminStats, Issue, User};

/// Body of `POST /v1/users/register`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

/// Body of `POST /v1/users/login`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /v1/issues`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CreateIssueRequest {
    pub title: String,
    pub description: String,
}

/// Body of `PATCH /v1/issues/{id}/status`.
///
/// Kept as a string so an unknown value is a validation failure, not a decode error.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IssueResponse {
    pub issue: Issue,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IssueListResponse {
    pub issues: Vec<Issue>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub stats: AdminStats,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Body of `GET /v1/health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}
