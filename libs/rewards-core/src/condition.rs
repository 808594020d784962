//! Trigger condition schema.
//!
//! Conditions are stored as JSON objects tagged by `type`, for example
//! `{"type": "duration_total", "minutes": 60}`. They are parsed once when a
//! rule set is compiled and rejected there if invalid.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::types::{ProgressKey, ProgressKind};

const KINDS: [&str; 6] = [
    "duration_total",
    "consecutive_days",
    "project_completion_count",
    "efficiency_score",
    "daily_frequency",
    "session_count",
];

/// Typed threshold attached to a rule or achievement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerCondition {
    DurationTotal {
        minutes: i64,
        #[serde(default, alias = "projectId", skip_serializing_if = "Option::is_none")]
        project_id: Option<Uuid>,
    },
    ConsecutiveDays {
        days: i64,
    },
    ProjectCompletionCount {
        count: i64,
    },
    EfficiencyScore {
        #[serde(alias = "minPercent")]
        min_percent: i64,
    },
    DailyFrequency {
        count: i64,
    },
    SessionCount {
        count: i64,
    },
}

/// How a value is compared against the condition threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossing {
    /// Every multiple of the threshold counts once.
    Cumulative,
    /// Counts once each time the value rises to the threshold.
    Level,
}

impl TriggerCondition {
    /// Parse and validate a JSON condition config.
    pub fn parse(config: &Value) -> Result<Self, ValidationError> {
        let object = config.as_object().ok_or(ValidationError::NotAnObject)?;
        let kind = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ValidationError::MissingKind)?;

        if !KINDS.contains(&kind) {
            return Err(ValidationError::UnknownKind(kind.to_string()));
        }

        let condition: Self =
            serde_json::from_value(config.clone()).map_err(|e| ValidationError::Malformed {
                kind: kind.to_string(),
                message: e.to_string(),
            })?;
        condition.validate()?;
        Ok(condition)
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Self::EfficiencyScore { min_percent } = self {
            if *min_percent > 100 {
                return Err(ValidationError::OutOfRange {
                    field: "min_percent",
                    value: *min_percent,
                });
            }
        }

        let threshold = self.threshold();
        if threshold <= 0 {
            return Err(ValidationError::NonPositive {
                field: self.threshold_field(),
                value: threshold,
            });
        }
        Ok(())
    }

    /// Serialize back to the stored JSON form.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Progress kind this condition reads.
    pub fn kind(&self) -> ProgressKind {
        match self {
            Self::DurationTotal { .. } => ProgressKind::DurationTotal,
            Self::ConsecutiveDays { .. } => ProgressKind::ConsecutiveDays,
            Self::ProjectCompletionCount { .. } => ProgressKind::ProjectCompletions,
            Self::EfficiencyScore { .. } => ProgressKind::Efficiency,
            Self::DailyFrequency { .. } => ProgressKind::DailyFrequency,
            Self::SessionCount { .. } => ProgressKind::SessionCount,
        }
    }

    /// Progress record this condition reads.
    pub fn progress_key(&self) -> ProgressKey {
        match self {
            Self::DurationTotal {
                project_id: Some(project_id),
                ..
            } => ProgressKey::scoped(ProgressKind::DurationTotal, *project_id),
            _ => ProgressKey::user(self.kind()),
        }
    }

    pub fn threshold(&self) -> i64 {
        match self {
            Self::DurationTotal { minutes, .. } => *minutes,
            Self::ConsecutiveDays { days } => *days,
            Self::ProjectCompletionCount { count }
            | Self::DailyFrequency { count }
            | Self::SessionCount { count } => *count,
            Self::EfficiencyScore { min_percent } => *min_percent,
        }
    }

    fn threshold_field(&self) -> &'static str {
        match self {
            Self::DurationTotal { .. } => "minutes",
            Self::ConsecutiveDays { .. } => "days",
            Self::EfficiencyScore { .. } => "min_percent",
            _ => "count",
        }
    }

    pub fn crossing(&self) -> Crossing {
        match self {
            Self::EfficiencyScore { .. } | Self::DailyFrequency { .. } => Crossing::Level,
            _ => Crossing::Cumulative,
        }
    }

    /// Whether `value` satisfies the threshold at least once.
    pub fn is_met(&self, value: i64) -> bool {
        value >= self.threshold()
    }

    /// Number of threshold units newly crossed moving from `baseline` to
    /// `current`.
    ///
    /// Computed from both endpoints, so a jump over several units awards all
    /// of them and replaying the same transition yields the same count.
    pub fn units_crossed(&self, baseline: i64, current: i64) -> i64 {
        let threshold = self.threshold();
        if threshold <= 0 || current <= baseline {
            return 0;
        }
        match self.crossing() {
            Crossing::Cumulative => (current / threshold - baseline.max(0) / threshold).max(0),
            Crossing::Level => i64::from(baseline < threshold && current >= threshold),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_duration_total() {
        let condition = TriggerCondition::parse(&json!({"type": "duration_total", "minutes": 60}))
            .unwrap();
        assert_eq!(
            condition,
            TriggerCondition::DurationTotal {
                minutes: 60,
                project_id: None
            }
        );
        assert_eq!(condition.progress_key(), ProgressKey::user(ProgressKind::DurationTotal));
    }

    #[test]
    fn project_scoped_duration_uses_scoped_key() {
        let project = Uuid::new_v4();
        let condition = TriggerCondition::parse(&json!({
            "type": "duration_total",
            "minutes": 120,
            "projectId": project,
        }))
        .unwrap();
        assert_eq!(
            condition.progress_key(),
            ProgressKey::scoped(ProgressKind::DurationTotal, project)
        );
    }

    #[test]
    fn accepts_camel_case_min_percent() {
        let condition =
            TriggerCondition::parse(&json!({"type": "efficiency_score", "minPercent": 80})).unwrap();
        assert_eq!(condition, TriggerCondition::EfficiencyScore { min_percent: 80 });
    }

    #[test]
    fn rejects_unknown_kind() {
        let err = TriggerCondition::parse(&json!({"type": "login_days", "days": 3})).unwrap_err();
        assert_eq!(err, ValidationError::UnknownKind("login_days".to_string()));
    }

    #[test]
    fn rejects_missing_kind_and_non_objects() {
        assert_eq!(
            TriggerCondition::parse(&json!({"minutes": 3})).unwrap_err(),
            ValidationError::MissingKind
        );
        assert_eq!(
            TriggerCondition::parse(&json!("duration_total")).unwrap_err(),
            ValidationError::NotAnObject
        );
    }

    #[test]
    fn rejects_missing_field() {
        let err = TriggerCondition::parse(&json!({"type": "consecutive_days"})).unwrap_err();
        assert!(matches!(err, ValidationError::Malformed { kind, .. } if kind == "consecutive_days"));
    }

    #[test]
    fn rejects_non_positive_threshold() {
        let err = TriggerCondition::parse(&json!({"type": "session_count", "count": 0})).unwrap_err();
        assert_eq!(
            err,
            ValidationError::NonPositive {
                field: "count",
                value: 0
            }
        );
    }

    #[test]
    fn rejects_percent_above_hundred() {
        let err = TriggerCondition::parse(&json!({"type": "efficiency_score", "min_percent": 120}))
            .unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { value: 120, .. }));
    }

    #[test]
    fn cumulative_units_cover_multi_unit_jumps() {
        let condition = TriggerCondition::DurationTotal {
            minutes: 60,
            project_id: None,
        };
        assert_eq!(condition.units_crossed(0, 70), 1);
        assert_eq!(condition.units_crossed(50, 190), 3);
        assert_eq!(condition.units_crossed(61, 119), 0);
        assert_eq!(condition.units_crossed(120, 100), 0);
    }

    #[test]
    fn level_units_only_on_rising_edge() {
        let condition = TriggerCondition::EfficiencyScore { min_percent: 80 };
        assert_eq!(condition.units_crossed(70, 85), 1);
        assert_eq!(condition.units_crossed(82, 90), 0);
        assert_eq!(condition.units_crossed(90, 70), 0);
    }

    #[test]
    fn daily_frequency_fires_once_per_day() {
        let condition = TriggerCondition::DailyFrequency { count: 1 };
        assert_eq!(condition.crossing(), Crossing::Level);
        assert_eq!(condition.units_crossed(0, 1), 1);
        assert_eq!(condition.units_crossed(1, 2), 0);
        assert_eq!(condition.units_crossed(2, 3), 0);
    }

    #[test]
    fn to_json_round_trips() {
        let condition = TriggerCondition::DailyFrequency { count: 2 };
        assert_eq!(TriggerCondition::parse(&condition.to_json()).unwrap(), condition);
    }
}
