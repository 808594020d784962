//! Progress, achievement and points endpoints

use axum::{
    extract::{Query, State},
    Extension, Json,
};

use crate::error::Result;
use crate::models::*;
use crate::routes::auth::AuthenticatedUser;
use crate::AppState;

const DEFAULT_LEDGER_LIMIT: i64 = 100;
const MAX_LEDGER_LIMIT: i64 = 1000;

/// GET /api/progress
pub async fn progress(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<ProgressResponse>> {
    let records = state.db.get_progress(auth.user_id).await?;
    Ok(Json(ProgressResponse { records }))
}

/// GET /api/achievements
/// Active achievements plus any the user already completed
pub async fn achievements(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<AchievementListResponse>> {
    let achievements = state.db.list_achievement_views(auth.user_id).await?;
    Ok(Json(AchievementListResponse { achievements }))
}

/// GET /api/points
/// Current balance and recent ledger entries, newest first
pub async fn points(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<PointsResponse>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LEDGER_LIMIT)
        .clamp(1, MAX_LEDGER_LIMIT);
    let balance = state.db.get_balance(auth.user_id).await?;
    let entries = state.db.list_ledger_entries(auth.user_id, limit).await?;

    Ok(Json(PointsResponse { balance, entries }))
}
