use axum::{extract::State, Json};
use serde::Deserialize;

use super::present;
use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{EnsureUserOutcome, UserService};

#[derive(Debug, Default, Deserialize)]
pub struct CreateUserRequest {
    pub email: Option<String>,
    pub screenname: Option<String>,
}

/// POST /api/auth/create_user - make sure the signed-in identity has a users row
///
/// Idempotent; `was_inaugural_login` is true only for the call that created the row.
/// A missing or unreadable body is treated as `{}`.
pub async fn create_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    body: Option<Json<CreateUserRequest>>,
) -> ApiResult<EnsureUserOutcome> {
    let Json(request) = body.unwrap_or_default();
    let email = present(request.email);
    let screenname = present(request.screenname);
    tracing::info!("create_user for {} (email given: {})", auth_user.id, email.is_some());

    let outcome = UserService::new(&state.managed)
        .ensure_user(&auth_user.id, email.as_deref(), screenname.as_deref())
        .await?;
    Ok(ApiResponse::success(outcome))
}
