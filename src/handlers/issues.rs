//! Issue CRUD.
//!
//! Listing is scoped to the caller. Single-issue reads, status updates and
//! deletes address any issue by id.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::{info, instrument};

use super::util::parse_id;
use crate::error::AppResult;
use crate::json::JsonBody;
use crate::middleware::AuthUser;
use crate::models::{
    CreateIssueRequest, IssueListResponse, IssueResponse, MessageResponse, NewIssue,
    UpdateStatusRequest,
};
use crate::state::AppState;
use crate::validation::{validate_issue, validate_status};

/// `POST /v1/issues`
#[instrument(skip(state, payload))]
pub async fn create_issue(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    JsonBody(payload): JsonBody<CreateIssueRequest>,
) -> AppResult<(StatusCode, Json<IssueResponse>)> {
    let draft = validate_issue(&payload)?;

    let issue = state
        .storage
        .issues
        .create(NewIssue {
            user_id: caller.user_id,
            title: draft.title,
            description: draft.description,
        })
        .await?;

    info!(issue_id = issue.id, "Issue created");
    Ok((StatusCode::CREATED, Json(IssueResponse { issue })))
}

/// `GET /v1/issues`
#[instrument(skip(state))]
pub async fn list_issues(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> AppResult<Json<IssueListResponse>> {
    let issues = state.storage.issues.list_by_user(caller.user_id).await?;
    Ok(Json(IssueListResponse { issues }))
}

/// `GET /v1/issues/{id}`
#[instrument(skip(state))]
pub async fn get_issue(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<IssueResponse>> {
    let id = parse_id(&id)?;
    let issue = state.storage.issues.get(id).await?;
    Ok(Json(IssueResponse { issue }))
}

/// `PATCH /v1/issues/{id}/status`
#[instrument(skip(state, payload))]
pub async fn update_issue_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<UpdateStatusRequest>,
) -> AppResult<Json<IssueResponse>> {
    let id = parse_id(&id)?;
    // Existence is checked before the new value
    state.storage.issues.get(id).await?;
    let status = validate_status(&payload.status)?;

    let issue = state.storage.issues.update_status(id, status).await?;
    info!(issue_id = id, status = %status, "Issue status updated");
    Ok(Json(IssueResponse { issue }))
}

/// `DELETE /v1/issues/{id}`
#[instrument(skip(state))]
pub async fn delete_issue(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_id(&id)?;
    state.storage.issues.delete(id).await?;

    info!(issue_id = id, "Issue deleted");
    Ok(Json(MessageResponse {
        message: "issue deleted".to_string(),
    }))
}
