//! Study sessions, progress records and achievement state

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use sqlx::{PgConnection, Row};
use uuid::Uuid;

use rewards_core::ProgressSnapshot;

use super::Database;
use crate::error::{ApiError, Result};
use crate::models::*;

/// Insert a session. Returns `false` when the user already recorded this id.
///
/// An id already taken by another user's session is a conflict.
pub async fn insert_session(conn: &mut PgConnection, session: &DbStudySession) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO study_sessions (id, user_id, project_id, study_date, duration_minutes,
                                    completes_project, efficiency_percent, note, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(session.id)
    .bind(session.user_id)
    .bind(session.project_id)
    .bind(session.study_date)
    .bind(session.duration_minutes)
    .bind(session.completes_project)
    .bind(session.efficiency_percent)
    .bind(&session.note)
    .bind(session.created_at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 1 {
        return Ok(true);
    }

    let owner: Uuid = sqlx::query_scalar("SELECT user_id FROM study_sessions WHERE id = $1")
        .bind(session.id)
        .fetch_one(&mut *conn)
        .await?;
    if owner != session.user_id {
        return Err(ApiError::Conflict(format!(
            "session id {} is already in use",
            session.id
        )));
    }
    Ok(false)
}

/// Load everything the tracker needs to apply `session_id`.
///
/// The efficiency history excludes the session itself.
pub async fn load_snapshot(
    conn: &mut PgConnection,
    user_id: Uuid,
    session_id: Uuid,
    efficiency_window: usize,
) -> Result<ProgressSnapshot> {
    let rows = sqlx::query_as::<_, DbProgressRecord>(
        r#"
        SELECT user_id, kind, target_id, current_value, target_value, last_updated, updated_at
        FROM progress_records
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut snapshot = ProgressSnapshot::from_records(rows.iter().filter_map(|r| r.to_core()));

    snapshot.counted_projects = sqlx::query_scalar::<_, Uuid>(
        "SELECT project_id FROM project_completions WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .collect();

    let history = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT efficiency_percent
        FROM study_sessions
        WHERE user_id = $1 AND id <> $2 AND efficiency_percent IS NOT NULL
        ORDER BY created_at DESC
        LIMIT $3
        "#,
    )
    .bind(user_id)
    .bind(session_id)
    .bind(efficiency_window as i64)
    .fetch_all(&mut *conn)
    .await?;
    snapshot.recent_efficiency = Some(history);

    Ok(snapshot)
}

/// Upsert a progress record
pub async fn upsert_progress(conn: &mut PgConnection, record: &ProgressRecord) -> Result<()> {
    let row = DbProgressRecord::from_core(record);
    sqlx::query(
        r#"
        INSERT INTO progress_records (user_id, kind, target_id, current_value, target_value,
                                      last_updated, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (user_id, kind, target_id) DO UPDATE SET
            current_value = EXCLUDED.current_value,
            target_value = EXCLUDED.target_value,
            last_updated = EXCLUDED.last_updated,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(row.user_id)
    .bind(&row.kind)
    .bind(row.target_id)
    .bind(row.current_value)
    .bind(row.target_value)
    .bind(row.last_updated)
    .bind(row.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Mark a project as counted toward the completion total
pub async fn insert_project_completion(
    conn: &mut PgConnection,
    user_id: Uuid,
    project_id: Uuid,
    session_id: Uuid,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO project_completions (user_id, project_id, session_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, project_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(project_id)
    .bind(session_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Per-achievement state for a user, keyed by achievement id
pub async fn load_achievement_states(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> Result<HashMap<Uuid, UserAchievementState>> {
    let rows = sqlx::query_as::<_, DbUserAchievement>(
        r#"
        SELECT user_id, achievement_id, current_progress, is_completed, completed_at
        FROM user_achievements
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| (r.achievement_id, r.to_core()))
        .collect())
}

/// Upsert a user's achievement state.
///
/// A completed row never goes back to incomplete.
pub async fn upsert_achievement_state(
    conn: &mut PgConnection,
    state: &UserAchievementState,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO user_achievements (user_id, achievement_id, current_progress,
                                       is_completed, completed_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (user_id, achievement_id) DO UPDATE SET
            current_progress = EXCLUDED.current_progress,
            is_completed = user_achievements.is_completed OR EXCLUDED.is_completed,
            completed_at = COALESCE(user_achievements.completed_at, EXCLUDED.completed_at),
            updated_at = NOW()
        "#,
    )
    .bind(state.user_id)
    .bind(state.achievement_id)
    .bind(state.current_progress)
    .bind(state.is_completed)
    .bind(state.completed_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

impl Database {
    /// Most recent sessions first
    pub async fn list_sessions(&self, user_id: Uuid, limit: i64) -> Result<Vec<DbStudySession>> {
        let sessions = sqlx::query_as::<_, DbStudySession>(
            r#"
            SELECT id, user_id, project_id, study_date, duration_minutes, completes_project,
                   efficiency_percent, note, created_at
            FROM study_sessions
            WHERE user_id = $1
            ORDER BY study_date DESC, created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    /// All progress records for a user
    pub async fn get_progress(&self, user_id: Uuid) -> Result<Vec<ProgressRecord>> {
        let rows = sqlx::query_as::<_, DbProgressRecord>(
            r#"
            SELECT user_id, kind, target_id, current_value, target_value, last_updated, updated_at
            FROM progress_records
            WHERE user_id = $1
            ORDER BY kind, target_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(|r| r.to_core()).collect())
    }

    /// Study statistics as of `today`, with a calendar of the last `days` days
    pub async fn get_study_stats(
        &self,
        user_id: Uuid,
        today: NaiveDate,
        days: i64,
        efficiency_window: usize,
    ) -> Result<StudyStatsResponse> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(duration_minutes), 0)::BIGINT as total_minutes,
                COUNT(*)::BIGINT as total_sessions,
                COALESCE(SUM(CASE WHEN study_date = $2 THEN duration_minutes END), 0)::BIGINT
                    as minutes_today
            FROM study_sessions
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(today)
        .fetch_one(&self.pool)
        .await?;

        let projects_completed: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM project_completions WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        let average_efficiency: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT ROUND(AVG(efficiency_percent))::BIGINT
            FROM (
                SELECT efficiency_percent
                FROM study_sessions
                WHERE user_id = $1 AND efficiency_percent IS NOT NULL
                ORDER BY created_at DESC
                LIMIT $2
            ) recent
            "#,
        )
        .bind(user_id)
        .bind(efficiency_window as i64)
        .fetch_one(&self.pool)
        .await?;

        // A streak only counts while it is still alive today or yesterday.
        let streak = sqlx::query_as::<_, (i64, Option<NaiveDate>)>(
            r#"
            SELECT current_value, last_updated
            FROM progress_records
            WHERE user_id = $1 AND kind = $2 AND target_id = $3
            "#,
        )
        .bind(user_id)
        .bind(ProgressKind::ConsecutiveDays.as_str())
        .bind(Uuid::nil())
        .fetch_optional(&self.pool)
        .await?;
        let current_streak = match streak {
            Some((value, Some(last))) if last >= today - Duration::days(1) => value,
            _ => 0,
        };

        let calendar = sqlx::query_as::<_, CalendarDay>(
            r#"
            SELECT study_date as date,
                   SUM(duration_minutes)::BIGINT as minutes,
                   COUNT(*)::BIGINT as sessions
            FROM study_sessions
            WHERE user_id = $1 AND study_date > $2 AND study_date <= $3
            GROUP BY study_date
            ORDER BY study_date
            "#,
        )
        .bind(user_id)
        .bind(today - Duration::days(days))
        .bind(today)
        .fetch_all(&self.pool)
        .await?;

        Ok(StudyStatsResponse {
            total_minutes: row.get("total_minutes"),
            total_sessions: row.get("total_sessions"),
            current_streak,
            projects_completed,
            average_efficiency,
            minutes_today: row.get("minutes_today"),
            calendar,
        })
    }

    /// Active achievements joined with the user's state
    pub async fn list_achievement_views(&self, user_id: Uuid) -> Result<Vec<AchievementView>> {
        let rows = sqlx::query(
            r#"
            SELECT a.id, a.name, a.description, a.category, a.conditions, a.reward_points,
                   a.level, a.required_count,
                   COALESCE(ua.current_progress, 0) as current_progress,
                   COALESCE(ua.is_completed, FALSE) as is_completed,
                   ua.completed_at
            FROM achievements a
            LEFT JOIN user_achievements ua ON ua.achievement_id = a.id AND ua.user_id = $1
            WHERE a.is_active OR ua.is_completed
            ORDER BY a.sort_order, a.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| AchievementView {
                id: row.get("id"),
                name: row.get("name"),
                description: row.get("description"),
                category: row.get("category"),
                conditions: row.get("conditions"),
                reward_points: row.get("reward_points"),
                level: row.get("level"),
                required_count: row.get("required_count"),
                current_progress: row.get("current_progress"),
                is_completed: row.get("is_completed"),
                completed_at: row.get("completed_at"),
            })
            .collect())
    }
}
