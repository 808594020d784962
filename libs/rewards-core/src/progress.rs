//! Progress tracking.
//!
//! Turns one study session into updated progress records. Tracking never
//! awards points; it only reports what changed so the evaluator can decide.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{ProgressKey, ProgressKind, ProgressRecord, StudySession};

/// Default number of sessions in the efficiency trailing window.
pub const DEFAULT_EFFICIENCY_WINDOW: usize = 7;

/// A user's progress state before an event is applied.
#[derive(Debug, Clone, Default)]
pub struct ProgressSnapshot {
    pub records: HashMap<ProgressKey, ProgressRecord>,
    /// Projects already counted toward the completion total.
    pub counted_projects: HashSet<Uuid>,
    /// Efficiency of the most recent prior sessions, newest first.
    /// `None` when session history could not be loaded.
    pub recent_efficiency: Option<Vec<i64>>,
}

impl ProgressSnapshot {
    pub fn from_records(records: impl IntoIterator<Item = ProgressRecord>) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.key, r)).collect(),
            counted_projects: HashSet::new(),
            recent_efficiency: Some(Vec::new()),
        }
    }

    pub fn value(&self, key: &ProgressKey) -> i64 {
        self.records.get(key).map(|r| r.current_value).unwrap_or(0)
    }

    /// Fold a tracked event back into the snapshot.
    ///
    /// Used when several events are processed in sequence without a round
    /// trip through storage.
    pub fn absorb(&mut self, tracked: &TrackedEvent, session: &StudySession) {
        for update in &tracked.updates {
            self.records.insert(update.record.key, update.record.clone());
        }
        if let Some(project_id) = tracked.counted_project {
            self.counted_projects.insert(project_id);
        }
        if let (Some(history), Some(efficiency)) =
            (self.recent_efficiency.as_mut(), session.efficiency_percent)
        {
            history.insert(0, efficiency);
        }
    }
}

/// One record changed by an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub record: ProgressRecord,
    pub previous_value: i64,
    /// The aggregate restarted instead of advancing (broken streak, new day).
    pub reset: bool,
}

impl ProgressUpdate {
    pub fn key(&self) -> ProgressKey {
        self.record.key
    }

    /// Value threshold crossings are measured from.
    pub fn baseline(&self) -> i64 {
        if self.reset {
            0
        } else {
            self.previous_value
        }
    }
}

/// Result of applying one study session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackedEvent {
    pub updates: Vec<ProgressUpdate>,
    /// Project newly added to the counted set by this session.
    pub counted_project: Option<Uuid>,
}

/// Maintains running aggregates per progress key.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    efficiency_window: usize,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(DEFAULT_EFFICIENCY_WINDOW)
    }
}

impl ProgressTracker {
    pub fn new(efficiency_window: usize) -> Self {
        Self {
            efficiency_window: efficiency_window.max(1),
        }
    }

    pub fn efficiency_window(&self) -> usize {
        self.efficiency_window
    }

    /// Apply a completed session to the snapshot.
    ///
    /// `targets` maps progress keys to the display target for their records.
    pub fn apply_study_event(
        &self,
        snapshot: &ProgressSnapshot,
        session: &StudySession,
        targets: &HashMap<ProgressKey, i64>,
        now: DateTime<Utc>,
    ) -> TrackedEvent {
        let mut updates = Vec::new();
        let mut counted_project = None;
        let mut push = |key: ProgressKey, value: i64, reset: bool| {
            let previous = snapshot.records.get(&key).cloned();
            let previous_value = previous.as_ref().map(|r| r.current_value).unwrap_or(0);
            let mut record = previous
                .unwrap_or_else(|| ProgressRecord::empty(session.user_id, key, now));
            record.current_value = value.max(0);
            record.target_value = targets.get(&key).copied().unwrap_or(record.target_value);
            record.last_updated = Some(latest(record.last_updated, session.date));
            record.updated_at = now;
            updates.push(ProgressUpdate {
                record,
                previous_value,
                reset,
            });
        };

        if session.duration_minutes > 0 {
            let key = ProgressKey::user(ProgressKind::DurationTotal);
            push(key, snapshot.value(&key).saturating_add(session.duration_minutes), false);

            if let Some(project_id) = session.project_id {
                let key = ProgressKey::scoped(ProgressKind::DurationTotal, project_id);
                push(key, snapshot.value(&key).saturating_add(session.duration_minutes), false);
            }
        }

        let key = ProgressKey::user(ProgressKind::SessionCount);
        push(key, snapshot.value(&key).saturating_add(1), false);

        let key = ProgressKey::user(ProgressKind::ConsecutiveDays);
        if let Some((value, reset)) = next_streak(snapshot.records.get(&key), session.date) {
            push(key, value, reset);
        }

        let key = ProgressKey::user(ProgressKind::DailyFrequency);
        if let Some((value, reset)) = next_daily_count(snapshot.records.get(&key), session.date) {
            push(key, value, reset);
        }

        if session.completes_project {
            match session.project_id {
                Some(project_id) if !snapshot.counted_projects.contains(&project_id) => {
                    let key = ProgressKey::user(ProgressKind::ProjectCompletions);
                    push(key, snapshot.value(&key).saturating_add(1), false);
                    counted_project = Some(project_id);
                }
                Some(project_id) => {
                    tracing::debug!(%project_id, "project completion already counted");
                }
                None => {
                    tracing::debug!(session_id = %session.id, "completion signal without project");
                }
            }
        }

        match self.efficiency_average(snapshot, session) {
            Some(average) => {
                push(ProgressKey::user(ProgressKind::Efficiency), average, false);
            }
            None => {
                tracing::debug!(session_id = %session.id, "efficiency skipped, no data");
            }
        }

        TrackedEvent {
            updates,
            counted_project,
        }
    }

    fn efficiency_average(&self, snapshot: &ProgressSnapshot, session: &StudySession) -> Option<i64> {
        let current = session.efficiency_percent?;
        let history = snapshot.recent_efficiency.as_ref()?;

        let window: Vec<i64> = std::iter::once(current)
            .chain(history.iter().copied())
            .take(self.efficiency_window)
            .collect();
        let n = window.len() as i64;
        let sum = window.iter().fold(0i64, |acc, v| acc.saturating_add(*v));
        Some((sum + n / 2) / n)
    }
}

fn latest(last: Option<NaiveDate>, date: NaiveDate) -> NaiveDate {
    match last {
        Some(last) if last > date => last,
        _ => date,
    }
}

/// Next streak value, or `None` when the session leaves the streak alone.
fn next_streak(record: Option<&ProgressRecord>, date: NaiveDate) -> Option<(i64, bool)> {
    let Some(record) = record else {
        return Some((1, false));
    };
    match record.last_updated {
        None => Some((1, false)),
        Some(last) if date <= last => None,
        Some(last) if last.succ_opt() == Some(date) => Some((record.current_value.saturating_add(1), false)),
        Some(_) => Some((1, true)),
    }
}

/// Next same-day session count, or `None` for back-dated sessions.
fn next_daily_count(record: Option<&ProgressRecord>, date: NaiveDate) -> Option<(i64, bool)> {
    let Some(record) = record else {
        return Some((1, false));
    };
    match record.last_updated {
        None => Some((1, false)),
        Some(last) if date == last => Some((record.current_value.saturating_add(1), false)),
        Some(last) if date < last => None,
        Some(_) => Some((1, true)),
    }
}
