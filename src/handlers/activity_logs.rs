use axum::extract::{Query, State};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{ActivityLogPage, ActivityLogParams, ActivityLogQuery, ActivityService};

/// GET /api/activity-logs - paginated audit trail with user names
///
/// Query: `page` (default 1), `per_page` (default 20), `date_from` /
/// `date_to` (YYYY-MM-DD, inclusive), `user_uuid`.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ActivityLogParams>,
) -> ApiResult<ActivityLogPage> {
    let query = ActivityLogQuery::try_from(params).map_err(ApiError::bad_request)?;
    let page = ActivityService::new(&state.managed).list(&query).await?;
    Ok(ApiResponse::success(page))
}
