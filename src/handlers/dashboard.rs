use serde::Serialize;

use crate::middleware::{ApiResponse, ApiResult, AuthUser};

#[derive(Debug, Serialize)]
pub struct DashboardData {
    pub message: &'static str,
    pub user_id: String,
}

/// GET /api/dashboard - placeholder payload for the signed-in user
pub async fn dashboard(auth_user: AuthUser) -> ApiResult<DashboardData> {
    Ok(ApiResponse::success(DashboardData {
        message: "Dashboard data",
        user_id: auth_user.id,
    }))
}
