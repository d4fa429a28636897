mod api;
mod issue;
mod user;

pub use api::{
    AuthResponse, CreateIssueRequest, HealthResponse, IssueListResponse, IssueResponse,
    LoginRequest, MessageResponse, RegisterRequest, StatsResponse, UpdateStatusRequest,
};
pub use issue::{AdminStats, Issue, IssueStatus, NewIssue, StatusCount};
pub use user::{NewUser, User};
