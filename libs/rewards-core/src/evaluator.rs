//! Rule evaluation.
//!
//! Compares progress updates from one study event against the active points
//! rules and achievements. Every definition is evaluated independently
//! against the same updates, in ascending `sort_order`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::condition::{Crossing, TriggerCondition};
use crate::error::ValidationError;
use crate::progress::ProgressUpdate;
use crate::types::{
    Achievement, AchievementConfig, ProgressKey, RewardRule, RuleConfig, UserAchievementState,
};

impl TryFrom<RuleConfig> for RewardRule {
    type Error = ValidationError;

    fn try_from(config: RuleConfig) -> Result<Self, Self::Error> {
        let condition = TriggerCondition::parse(&config.conditions)?;
        if config.reward_points <= 0 {
            return Err(ValidationError::NonPositive {
                field: "reward_points",
                value: config.reward_points,
            });
        }
        Ok(Self {
            id: config.id,
            name: config.name,
            description: config.description,
            condition,
            reward_points: config.reward_points,
            level: config.level,
            is_active: config.is_active,
            sort_order: config.sort_order,
        })
    }
}

impl TryFrom<AchievementConfig> for Achievement {
    type Error = ValidationError;

    fn try_from(config: AchievementConfig) -> Result<Self, Self::Error> {
        let condition = TriggerCondition::parse(&config.conditions)?;
        if config.required_count <= 0 {
            return Err(ValidationError::NonPositive {
                field: "required_count",
                value: config.required_count,
            });
        }
        if config.reward_points < 0 {
            return Err(ValidationError::Negative {
                field: "reward_points",
                value: config.reward_points,
            });
        }
        Ok(Self {
            id: config.id,
            name: config.name,
            description: config.description,
            category: config.category,
            condition,
            reward_points: config.reward_points,
            level: config.level,
            required_count: config.required_count,
            is_active: config.is_active,
            sort_order: config.sort_order,
        })
    }
}

/// A definition dropped while compiling a rule set.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedDefinition {
    pub id: Uuid,
    pub name: String,
    pub error: ValidationError,
}

/// Active rules and achievements, validated and ordered.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<RewardRule>,
    achievements: Vec<Achievement>,
    skipped: Vec<SkippedDefinition>,
}

impl RuleSet {
    /// Build from already-validated definitions.
    pub fn new(rules: Vec<RewardRule>, achievements: Vec<Achievement>) -> Self {
        let mut rules: Vec<_> = rules.into_iter().filter(|r| r.is_active).collect();
        rules.sort_by_key(|r| (r.sort_order, r.id));
        let mut achievements: Vec<_> = achievements.into_iter().filter(|a| a.is_active).collect();
        achievements.sort_by_key(|a| (a.sort_order, a.id));

        Self {
            rules,
            achievements,
            skipped: Vec::new(),
        }
    }

    /// Validate stored configs, skipping (and logging) the invalid ones.
    pub fn compile(rules: Vec<RuleConfig>, achievements: Vec<AchievementConfig>) -> Self {
        let mut skipped = Vec::new();

        let rules = rules
            .into_iter()
            .filter_map(|config| {
                let (id, name) = (config.id, config.name.clone());
                RewardRule::try_from(config)
                    .map_err(|error| {
                        tracing::warn!(rule_id = %id, %name, %error, "skipping invalid points rule");
                        skipped.push(SkippedDefinition { id, name, error });
                    })
                    .ok()
            })
            .collect();

        let achievements = achievements
            .into_iter()
            .filter_map(|config| {
                let (id, name) = (config.id, config.name.clone());
                Achievement::try_from(config)
                    .map_err(|error| {
                        tracing::warn!(achievement_id = %id, %name, %error, "skipping invalid achievement");
                        skipped.push(SkippedDefinition { id, name, error });
                    })
                    .ok()
            })
            .collect();

        let mut set = Self::new(rules, achievements);
        set.skipped = skipped;
        set
    }

    pub fn rules(&self) -> &[RewardRule] {
        &self.rules
    }

    pub fn achievements(&self) -> &[Achievement] {
        &self.achievements
    }

    pub fn skipped(&self) -> &[SkippedDefinition] {
        &self.skipped
    }

    /// Largest achievement target per progress key, for progress bars.
    pub fn targets(&self) -> HashMap<ProgressKey, i64> {
        let mut targets = HashMap::new();
        for achievement in &self.achievements {
            let condition = &achievement.condition;
            let target = match condition.crossing() {
                Crossing::Cumulative => condition.threshold().saturating_mul(achievement.required_count),
                Crossing::Level => condition.threshold(),
            };
            let entry = targets.entry(condition.progress_key()).or_insert(0);
            *entry = (*entry).max(target);
        }
        targets
    }

    /// Decide which rules and achievements the updates newly satisfy.
    pub fn evaluate(
        &self,
        user_id: Uuid,
        updates: &[ProgressUpdate],
        states: &HashMap<Uuid, UserAchievementState>,
        now: DateTime<Utc>,
    ) -> Evaluation {
        let by_key: HashMap<ProgressKey, &ProgressUpdate> =
            updates.iter().map(|u| (u.key(), u)).collect();
        let mut evaluation = Evaluation::default();

        for rule in &self.rules {
            let Some(update) = by_key.get(&rule.condition.progress_key()) else {
                continue;
            };
            let units = rule
                .condition
                .units_crossed(update.baseline(), update.record.current_value);
            if units > 0 {
                evaluation.awards.push(Award {
                    source: AwardSource::Rule,
                    source_id: rule.id,
                    name: rule.name.clone(),
                    units,
                    points: units.saturating_mul(rule.reward_points),
                });
            }
        }

        for achievement in &self.achievements {
            let Some(update) = by_key.get(&achievement.condition.progress_key()) else {
                continue;
            };
            let previous = states
                .get(&achievement.id)
                .cloned()
                .unwrap_or_else(|| UserAchievementState::new(user_id, achievement.id));
            if previous.is_completed {
                continue;
            }

            let progress = achievement_progress(achievement, &previous, update);
            if progress <= previous.current_progress {
                continue;
            }

            let completed = progress >= achievement.required_count;
            let state = UserAchievementState {
                current_progress: progress,
                is_completed: completed,
                completed_at: completed.then_some(now),
                ..previous
            };

            if completed && achievement.reward_points > 0 {
                evaluation.awards.push(Award {
                    source: AwardSource::Achievement,
                    source_id: achievement.id,
                    name: achievement.name.clone(),
                    units: 1,
                    points: achievement.reward_points,
                });
            }
            evaluation.achievements.push(AchievementChange {
                achievement_id: achievement.id,
                name: achievement.name.clone(),
                newly_completed: completed,
                state,
            });
        }

        evaluation
    }
}

fn achievement_progress(
    achievement: &Achievement,
    previous: &UserAchievementState,
    update: &ProgressUpdate,
) -> i64 {
    let current = update.record.current_value;
    if achievement.required_count == 1 {
        return i64::from(achievement.condition.is_met(current));
    }
    let crossed = achievement.condition.units_crossed(update.baseline(), current);
    previous
        .current_progress
        .saturating_add(crossed)
        .min(achievement.required_count)
}

/// What produced an award.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AwardSource {
    Rule,
    Achievement,
}

/// Points owed for one rule or achievement in one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Award {
    pub source: AwardSource,
    pub source_id: Uuid,
    pub name: String,
    pub units: i64,
    pub points: i64,
}

/// New state for one achievement after a pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementChange {
    pub achievement_id: Uuid,
    pub name: String,
    pub newly_completed: bool,
    pub state: UserAchievementState,
}

/// Output of one evaluation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub awards: Vec<Award>,
    pub achievements: Vec<AchievementChange>,
}

impl Evaluation {
    pub fn total_points(&self) -> i64 {
        self.awards
            .iter()
            .fold(0i64, |acc, a| acc.saturating_add(a.points))
    }

    pub fn unlocked(&self) -> impl Iterator<Item = &AchievementChange> {
        self.achievements.iter().filter(|c| c.newly_completed)
    }
}
