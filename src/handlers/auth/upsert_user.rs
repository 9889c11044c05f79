use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};

use super::present;
use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{authenticate, ApiResponse, ApiResult};
use crate::services::{ProfileUpdate, StaffRole, UserService};

#[derive(Debug, Default, Deserialize)]
pub struct UpsertUserRequest {
    pub uuid: Option<String>,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub screenname: Option<String>,
    pub screen_name: Option<String>,
    pub username: Option<String>,
    pub role: Option<String>,
}

impl UpsertUserRequest {
    fn target_uuid(&mut self) -> Option<String> {
        present(self.uuid.take()).or_else(|| present(self.user_id.take()))
    }

    /// Unknown roles are dropped rather than rejected
    fn into_update(self) -> ProfileUpdate {
        ProfileUpdate {
            screenname: present(self.screenname)
                .or_else(|| present(self.screen_name))
                .or_else(|| present(self.username)),
            role: self.role.as_deref().and_then(StaffRole::parse),
            email: present(self.email),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UpsertUserResponse {
    pub success: bool,
    pub uuid: String,
}

/// POST /api/auth/upsert-user - set screen name, role or email after first login
///
/// The target user comes from the body (`uuid` or `user_id`), falling back to
/// the caller's access token.
pub async fn upsert_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<UpsertUserRequest>>,
) -> ApiResult<UpsertUserResponse> {
    let Json(mut request) = body.unwrap_or_default();

    let uuid = match request.target_uuid() {
        Some(uuid) => uuid,
        None => authenticate(&headers, &state)
            .await?
            .map(|user| user.id)
            .ok_or_else(|| ApiError::bad_request("uuid required"))?,
    };

    let update = request.into_update();
    if update.is_empty() {
        return Err(ApiError::bad_request("provide at least screenname, role, or email"));
    }

    UserService::new(&state.managed).upsert_profile(&uuid, &update).await?;
    Ok(ApiResponse::success(UpsertUserResponse { success: true, uuid }))
}
