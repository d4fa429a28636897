//! Registration and login.
//!
//! Both return the user record together with a freshly issued bearer token.
//! Accounts listed in `ADMIN_EMAILS` are granted [`Permissions::ADMIN`].

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::{Permissions, password, token};
use crate::error::{AppError, AppResult};
use crate::json::JsonBody;
use crate::models::{AuthResponse, LoginRequest, NewUser, RegisterRequest, User};
use crate::state::AppState;
use crate::store::StoreError;
use crate::validation::{validate_login, validate_registration};

const INVALID_CREDENTIALS: &str = "invalid email or password";

fn issue_token(state: &AppState, user_id: Uuid, permissions: Permissions) -> AppResult<String> {
    token::generate(
        user_id,
        permissions,
        &state.config.jwt_secret,
        state.config.token_ttl,
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}

/// Permissions an account holds once the admin list is applied.
fn effective_permissions(state: &AppState, email: &str, stored: Permissions) -> Permissions {
    if state.config.is_admin_email(email) {
        stored | Permissions::ADMIN
    } else {
        stored
    }
}

fn respond(state: &AppState, user: User) -> AppResult<Json<AuthResponse>> {
    let token = issue_token(state, user.id, user.permissions)?;
    Ok(Json(AuthResponse { user, token }))
}

/// `POST /v1/users/register`
#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let input = validate_registration(&payload)?;
    let permissions = effective_permissions(&state, &input.email, Permissions::DEFAULT);

    let password_hash = password::hash_blocking(input.password)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let user = state
        .storage
        .users
        .create(NewUser {
            email: input.email,
            name: input.name,
            password_hash,
            permissions,
        })
        .await?;

    info!(user_id = %user.id, permissions = %user.permissions, "User registered");
    Ok((StatusCode::CREATED, respond(&state, user)?))
}

/// `POST /v1/users/login`
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let creds = validate_login(&payload)?;

    let mut user = match state.storage.users.get_by_email(&creds.email).await {
        Ok(user) => user,
        Err(StoreError::NotFound(_)) => {
            return Err(AppError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let matches = password::verify_blocking(creds.password, user.password_hash.clone())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if !matches {
        return Err(AppError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
    }

    user.permissions = effective_permissions(&state, &user.email, user.permissions);
    respond(&state, user)
}
