use axum::extract::State;
use serde_json::Value;
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::UserService;

/// GET /api/auth/me - users row of the signed-in user
pub async fn me(State(state): State<AppState>, auth_user: AuthUser) -> ApiResult<Value> {
    let user = UserService::new(&state.managed)
        .find_by_uuid(&auth_user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let role = user.get("role").and_then(Value::as_str).unwrap_or("<none>");
    info!("auth/me resolved user {} with role {}", auth_user.id, role);
    Ok(ApiResponse::success(user))
}
