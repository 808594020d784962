//! Study event processing and manual point adjustments.
//!
//! Each operation loads what the core needs, lets `rewards_core` decide, and
//! persists the result inside one transaction holding the user's row lock.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use rewards_core::{process_study_event, record_award, ProgressTracker, RuleSet};

use crate::db::{self, Database};
use crate::error::{ApiError, Result};
use crate::models::*;
use crate::services::retry::with_retry;

/// Longest session accepted, one full day.
pub const MAX_SESSION_MINUTES: i64 = 24 * 60;

/// Reject sessions the tracker must never see.
///
/// Sessions dated after `today`, the current study day, are refused.
pub fn validate_session(session: &DbStudySession, today: NaiveDate) -> Result<()> {
    if session.duration_minutes <= 0 || session.duration_minutes > MAX_SESSION_MINUTES {
        return Err(ApiError::BadRequest(format!(
            "duration_minutes must be between 1 and {}, got {}",
            MAX_SESSION_MINUTES, session.duration_minutes
        )));
    }
    if session.study_date > today {
        return Err(ApiError::BadRequest(format!(
            "date {} is after the current study day {}",
            session.study_date, today
        )));
    }
    if let Some(efficiency) = session.efficiency_percent {
        if !(0..=100).contains(&efficiency) {
            return Err(ApiError::BadRequest(format!(
                "efficiency_percent must be between 0 and 100, got {}",
                efficiency
            )));
        }
    }
    if session.completes_project && session.project_id.is_none() {
        return Err(ApiError::BadRequest(
            "completes_project requires a project_id".to_string(),
        ));
    }
    Ok(())
}

/// Record a completed study session and everything it earns.
///
/// Replaying a session id is a no-op that reports `duplicate: true`.
pub async fn apply_study_event(
    db: &Database,
    tracker: &ProgressTracker,
    session: DbStudySession,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<SubmitSessionResponse> {
    validate_session(&session, today)?;
    let session = &session;
    with_retry("apply_study_event", move || {
        apply_study_event_once(db, tracker, session, now)
    })
    .await
}

async fn apply_study_event_once(
    db: &Database,
    tracker: &ProgressTracker,
    session: &DbStudySession,
    now: DateTime<Utc>,
) -> Result<SubmitSessionResponse> {
    let user_id = session.user_id;
    let mut tx = db.begin().await?;
    db::lock_user(&mut tx, user_id).await?;

    if !db::progress::insert_session(&mut tx, session).await? {
        let balance = db::ledger::last_balance(&mut tx, user_id).await?;
        tx.rollback().await?;
        tracing::debug!("Session {} already processed", session.id);
        return Ok(SubmitSessionResponse {
            session_id: session.id,
            duplicate: true,
            progress: Vec::new(),
            awards: Vec::new(),
            achievements: Vec::new(),
            points_earned: 0,
            balance,
        });
    }

    let rules = db::definitions::load_active_rules(&mut tx).await?;
    let achievements = db::definitions::load_active_achievements(&mut tx).await?;
    let rule_set = RuleSet::compile(
        rules.iter().map(|r| r.to_config()).collect(),
        achievements.iter().map(|a| a.to_config()).collect(),
    );

    let snapshot =
        db::progress::load_snapshot(&mut tx, user_id, session.id, tracker.efficiency_window())
            .await?;
    let states = db::progress::load_achievement_states(&mut tx, user_id).await?;

    let core_session = session.to_core();
    let outcome = process_study_event(tracker, &rule_set, &snapshot, &states, &core_session, now);

    for update in &outcome.tracked.updates {
        db::progress::upsert_progress(&mut tx, &update.record).await?;
    }
    if let Some(project_id) = outcome.tracked.counted_project {
        db::progress::insert_project_completion(&mut tx, user_id, project_id, session.id).await?;
    }
    for change in &outcome.evaluation.achievements {
        db::progress::upsert_achievement_state(&mut tx, &change.state).await?;
    }

    let last_balance = db::ledger::last_balance(&mut tx, user_id).await?;
    let entries = outcome.ledger_entries(user_id, last_balance, session.id, now)?;
    for entry in &entries {
        db::ledger::insert_entry(&mut tx, entry).await?;
    }
    let balance = entries.last().map(|e| e.balance_after).unwrap_or(last_balance);

    tx.commit().await?;

    let points_earned = outcome.evaluation.total_points();
    tracing::info!(
        user_id = %user_id,
        session_id = %session.id,
        minutes = session.duration_minutes,
        points_earned,
        unlocked = outcome.evaluation.unlocked().count(),
        "Applied study session"
    );

    Ok(SubmitSessionResponse {
        session_id: session.id,
        duplicate: false,
        progress: outcome
            .tracked
            .updates
            .into_iter()
            .map(|u| u.record)
            .collect(),
        awards: outcome.evaluation.awards,
        achievements: outcome.evaluation.achievements,
        points_earned,
        balance,
    })
}

/// Apply an admin bonus or expiry to a user's balance.
///
/// `points` is the magnitude; expiries are written as debits.
pub async fn adjust_points(
    db: &Database,
    user_id: Uuid,
    kind: LedgerKind,
    points: i64,
    now: DateTime<Utc>,
) -> Result<LedgerEntry> {
    if !matches!(kind, LedgerKind::Bonus | LedgerKind::Expired) {
        return Err(ApiError::BadRequest(format!(
            "kind must be bonus or expired, got {}",
            kind.as_str()
        )));
    }
    if points <= 0 {
        return Err(ApiError::BadRequest(format!(
            "points must be positive, got {}",
            points
        )));
    }
    let delta = if kind.is_debit() { -points } else { points };

    with_retry("adjust_points", move || async move {
        let mut tx = db.begin().await?;
        db::lock_user(&mut tx, user_id).await?;
        let last_balance = db::ledger::last_balance(&mut tx, user_id).await?;
        let entry = record_award(user_id, last_balance, None, delta, kind, None, now)?;
        db::ledger::insert_entry(&mut tx, &entry).await?;
        tx.commit().await?;

        tracing::info!(
            user_id = %user_id,
            kind = kind.as_str(),
            delta,
            balance = entry.balance_after,
            "Adjusted points"
        );
        Ok(entry)
    })
    .await
}
