use axum::Json;
use axum::extract::State;
use tracing::instrument;

use crate::error::AppResult;
use crate::models::StatsResponse;
use crate::state::AppState;

/// `GET /v1/admin/stats`. Gated by `require_admin` in the router.
#[instrument(skip(state))]
pub async fn stats(State(state): State<AppState>) -> AppResult<Json<StatsResponse>> {
    let stats = state.storage.admin.stats().await?;
    Ok(Json(StatsResponse { stats }))
}
