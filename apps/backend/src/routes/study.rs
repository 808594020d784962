//! Study session endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use rewards_core::study_day;

use crate::error::Result;
use crate::models::*;
use crate::routes::auth::AuthenticatedUser;
use crate::services::rewards;
use crate::AppState;

const DEFAULT_SESSION_LIMIT: i64 = 50;
const MAX_SESSION_LIMIT: i64 = 500;
const DEFAULT_CALENDAR_DAYS: i64 = 30;
const MAX_CALENDAR_DAYS: i64 = 366;

/// POST /api/study/sessions
/// Records a completed session and returns what it earned
pub async fn submit_session(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(payload): Json<SubmitSessionRequest>,
) -> Result<(StatusCode, Json<SubmitSessionResponse>)> {
    let now = state.clock.now();
    let today = study_day(now, state.config.daily_reset_hour);
    let session = DbStudySession {
        id: payload.id.unwrap_or_else(Uuid::new_v4),
        user_id: auth.user_id,
        project_id: payload.project_id,
        study_date: payload.date.unwrap_or(today),
        duration_minutes: payload.duration_minutes,
        completes_project: payload.completes_project,
        efficiency_percent: payload.efficiency_percent,
        note: payload.note,
        created_at: now,
    };

    let response = rewards::apply_study_event(&state.db, &state.tracker, session, today, now).await?;
    let status = if response.duplicate {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    Ok((status, Json(response)))
}

/// GET /api/study/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<SessionListResponse>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_SESSION_LIMIT)
        .clamp(1, MAX_SESSION_LIMIT);
    let sessions = state.db.list_sessions(auth.user_id, limit).await?;

    Ok(Json(SessionListResponse { sessions }))
}

/// GET /api/study/stats
pub async fn stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(query): Query<StudyStatsQuery>,
) -> Result<Json<StudyStatsResponse>> {
    let today = study_day(state.clock.now(), state.config.daily_reset_hour);
    let days = query
        .days
        .unwrap_or(DEFAULT_CALENDAR_DAYS)
        .clamp(1, MAX_CALENDAR_DAYS);

    let stats = state
        .db
        .get_study_stats(auth.user_id, today, days, state.tracker.efficiency_window())
        .await?;

    Ok(Json(stats))
}
