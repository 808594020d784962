//! Study event pipeline: tracker, then evaluator, then ledger entries.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::LedgerError;
use crate::evaluator::{Evaluation, RuleSet};
use crate::ledger;
use crate::progress::{ProgressSnapshot, ProgressTracker, TrackedEvent};
use crate::types::{LedgerEntry, LedgerKind, StudySession, UserAchievementState};

/// Everything one study event changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventOutcome {
    pub tracked: TrackedEvent,
    pub evaluation: Evaluation,
}

impl EventOutcome {
    /// Earned ledger entries for the awards, chained from `last_balance`.
    pub fn ledger_entries(
        &self,
        user_id: Uuid,
        last_balance: i64,
        cause_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let mut balance = last_balance;
        let mut entries = Vec::with_capacity(self.evaluation.awards.len());
        for award in &self.evaluation.awards {
            let entry = ledger::record_award(
                user_id,
                balance,
                Some(award.source_id),
                award.points,
                LedgerKind::Earned,
                Some(cause_id),
                now,
            )?;
            balance = entry.balance_after;
            entries.push(entry);
        }
        Ok(entries)
    }
}

/// Run one completed session through tracking and evaluation.
pub fn process_study_event(
    tracker: &ProgressTracker,
    rule_set: &RuleSet,
    snapshot: &ProgressSnapshot,
    achievement_states: &HashMap<Uuid, UserAchievementState>,
    session: &StudySession,
    now: DateTime<Utc>,
) -> EventOutcome {
    let tracked = tracker.apply_study_event(snapshot, session, &rule_set.targets(), now);
    let evaluation = rule_set.evaluate(session.user_id, &tracked.updates, achievement_states, now);
    EventOutcome {
        tracked,
        evaluation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, FixedClock};
    use crate::ledger::{verify, Ledger};
    use crate::types::{AchievementConfig, ProgressKey, ProgressKind, RuleConfig};
    use chrono::{NaiveDate, TimeZone};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn rule_set() -> RuleSet {
        RuleSet::compile(
            vec![RuleConfig {
                id: Uuid::new_v4(),
                name: "+10 per hour".to_string(),
                description: String::new(),
                conditions: json!({"type": "duration_total", "minutes": 60}),
                reward_points: 10,
                level: None,
                is_active: true,
                sort_order: 0,
            }],
            vec![AchievementConfig {
                id: Uuid::new_v4(),
                name: "First project".to_string(),
                description: String::new(),
                category: "projects".to_string(),
                conditions: json!({"type": "project_completion_count", "count": 1}),
                reward_points: 0,
                level: None,
                required_count: 1,
                is_active: true,
                sort_order: 0,
            }],
        )
    }

    fn session(user_id: Uuid, date: NaiveDate, minutes: i64) -> StudySession {
        StudySession {
            id: Uuid::new_v4(),
            user_id,
            project_id: Some(Uuid::new_v4()),
            date,
            duration_minutes: minutes,
            completes_project: false,
            efficiency_percent: None,
        }
    }

    #[test]
    fn seventy_minute_project_session() {
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 1, 5, 18, 0, 0).unwrap());
        let user = Uuid::new_v4();
        let rules = rule_set();
        let mut s = session(user, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(), 70);
        s.completes_project = true;

        let outcome = process_study_event(
            &ProgressTracker::default(),
            &rules,
            &ProgressSnapshot::default(),
            &HashMap::new(),
            &s,
            clock.now(),
        );

        let entries = outcome.ledger_entries(user, 0, s.id, clock.now()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].points_delta, 10);
        assert_eq!(entries[0].balance_after, 10);

        let unlocked: Vec<_> = outcome.evaluation.unlocked().collect();
        assert_eq!(unlocked.len(), 1);
        assert!(unlocked[0].state.is_completed);
        assert_eq!(unlocked[0].state.completed_at, Some(clock.now()));
    }

    #[test]
    fn sequence_of_sessions_keeps_ledger_consistent() {
        let user = Uuid::new_v4();
        let rules = rule_set();
        let tracker = ProgressTracker::default();
        let mut snapshot = ProgressSnapshot::default();
        let mut states = HashMap::new();
        let mut ledger = Ledger::new(user);

        for (day, minutes) in [(1, 45), (2, 30), (3, 200), (3, 5)] {
            let s = session(user, NaiveDate::from_ymd_opt(2024, 3, day).unwrap(), minutes);
            let now = Utc::now();
            let outcome = process_study_event(&tracker, &rules, &snapshot, &states, &s, now);
            for award in &outcome.evaluation.awards {
                ledger
                    .record_award(Some(award.source_id), award.points, LedgerKind::Earned, Some(s.id), now)
                    .unwrap();
            }
            for change in &outcome.evaluation.achievements {
                states.insert(change.achievement_id, change.state.clone());
            }
            snapshot.absorb(&outcome.tracked, &s);
        }

        // 280 minutes total crosses four hour marks.
        assert_eq!(snapshot.value(&ProgressKey::user(ProgressKind::DurationTotal)), 280);
        assert_eq!(ledger.balance(), 40);
        assert!(verify(ledger.entries()).is_ok());
        assert_eq!(snapshot.value(&ProgressKey::user(ProgressKind::ConsecutiveDays)), 3);
    }

    #[test]
    fn replayed_session_is_detected_by_ledger() {
        let user = Uuid::new_v4();
        let rules = rule_set();
        let s = session(user, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(), 60);
        let snapshot = ProgressSnapshot::default();
        let outcome = process_study_event(
            &ProgressTracker::default(),
            &rules,
            &snapshot,
            &HashMap::new(),
            &s,
            Utc::now(),
        );

        let mut ledger = Ledger::new(user);
        for award in &outcome.evaluation.awards {
            if !ledger.has_award(award.source_id, s.id) {
                ledger
                    .record_award(Some(award.source_id), award.points, LedgerKind::Earned, Some(s.id), Utc::now())
                    .unwrap();
            }
        }
        let replay = process_study_event(
            &ProgressTracker::default(),
            &rules,
            &snapshot,
            &HashMap::new(),
            &s,
            Utc::now(),
        );
        for award in &replay.evaluation.awards {
            assert!(ledger.has_award(award.source_id, s.id));
        }
        assert_eq!(ledger.balance(), 10);
    }

    #[test]
    fn streak_gap_resets_to_one() {
        let user = Uuid::new_v4();
        let mut snapshot = ProgressSnapshot::default();
        let key = ProgressKey::user(ProgressKind::ConsecutiveDays);
        snapshot.records.insert(
            key,
            crate::types::ProgressRecord {
                user_id: user,
                key,
                current_value: 6,
                target_value: 7,
                last_updated: NaiveDate::from_ymd_opt(2024, 1, 5),
                updated_at: Utc::now(),
            },
        );

        let s = session(user, NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(), 30);
        let outcome = process_study_event(
            &ProgressTracker::default(),
            &rule_set(),
            &snapshot,
            &HashMap::new(),
            &s,
            Utc::now(),
        );
        let streak = outcome
            .tracked
            .updates
            .iter()
            .find(|u| u.key() == key)
            .unwrap();
        assert_eq!(streak.record.current_value, 1);
        assert!(streak.reset);
    }
}
