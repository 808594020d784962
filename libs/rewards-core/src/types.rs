//! Core types for the study rewards system.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::condition::TriggerCondition;

/// Category of trackable aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressKind {
    DurationTotal,
    ConsecutiveDays,
    ProjectCompletions,
    Efficiency,
    DailyFrequency,
    SessionCount,
}

impl ProgressKind {
    pub const ALL: [ProgressKind; 6] = [
        Self::DurationTotal,
        Self::ConsecutiveDays,
        Self::ProjectCompletions,
        Self::Efficiency,
        Self::DailyFrequency,
        Self::SessionCount,
    ];

    /// Get the kind name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DurationTotal => "duration_total",
            Self::ConsecutiveDays => "consecutive_days",
            Self::ProjectCompletions => "project_completions",
            Self::Efficiency => "efficiency",
            Self::DailyFrequency => "daily_frequency",
            Self::SessionCount => "session_count",
        }
    }

    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

/// Identifies one progress record for a user.
///
/// `target_id` scopes the aggregate to a single project; `None` is the
/// user-wide total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgressKey {
    pub kind: ProgressKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<Uuid>,
}

impl ProgressKey {
    pub fn user(kind: ProgressKind) -> Self {
        Self {
            kind,
            target_id: None,
        }
    }

    pub fn scoped(kind: ProgressKind, target_id: Uuid) -> Self {
        Self {
            kind,
            target_id: Some(target_id),
        }
    }
}

/// Running aggregate for one progress key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub user_id: Uuid,
    pub key: ProgressKey,
    pub current_value: i64,
    pub target_value: i64,
    /// Study day of the last event applied to this record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<NaiveDate>,
    pub updated_at: DateTime<Utc>,
}

impl ProgressRecord {
    /// Fresh record with no progress.
    pub fn empty(user_id: Uuid, key: ProgressKey, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            key,
            current_value: 0,
            target_value: 0,
            last_updated: None,
            updated_at: now,
        }
    }
}

/// A completed study session as reported by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySession {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<Uuid>,
    pub date: NaiveDate,
    pub duration_minutes: i64,
    pub completes_project: bool,
    /// Client-reported focus score for the session (0-100).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub efficiency_percent: Option<i64>,
}

/// Points rule as stored by the admin (condition not yet validated).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub conditions: serde_json::Value,
    pub reward_points: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<i32>,
    pub is_active: bool,
    pub sort_order: i32,
}

/// Achievement as stored by the admin (condition not yet validated).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementConfig {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub conditions: serde_json::Value,
    pub reward_points: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<i32>,
    pub required_count: i64,
    pub is_active: bool,
    pub sort_order: i32,
}

/// Repeatable points rule with a validated condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardRule {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub condition: TriggerCondition,
    pub reward_points: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<i32>,
    pub is_active: bool,
    pub sort_order: i32,
}

/// Achievement (badge) with a validated condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub condition: TriggerCondition,
    pub reward_points: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<i32>,
    /// Number of times the condition must be satisfied.
    pub required_count: i64,
    pub is_active: bool,
    pub sort_order: i32,
}

/// Per-user progress on one achievement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAchievementState {
    pub user_id: Uuid,
    pub achievement_id: Uuid,
    pub current_progress: i64,
    pub is_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl UserAchievementState {
    pub fn new(user_id: Uuid, achievement_id: Uuid) -> Self {
        Self {
            user_id,
            achievement_id,
            current_progress: 0,
            is_completed: false,
            completed_at: None,
        }
    }
}

/// Ledger entry kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    Earned,
    Used,
    Bonus,
    Expired,
    Refund,
}

impl LedgerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Earned => "earned",
            Self::Used => "used",
            Self::Bonus => "bonus",
            Self::Expired => "expired",
            Self::Refund => "refund",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "earned" => Some(Self::Earned),
            "used" => Some(Self::Used),
            "bonus" => Some(Self::Bonus),
            "expired" => Some(Self::Expired),
            "refund" => Some(Self::Refund),
            _ => None,
        }
    }

    /// Whether entries of this kind take points away.
    pub fn is_debit(&self) -> bool {
        matches!(self, Self::Used | Self::Expired)
    }
}

/// Immutable record of one balance change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Rule, achievement or product that caused the change.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<Uuid>,
    pub kind: LedgerKind,
    pub points_delta: i64,
    pub balance_after: i64,
    pub created_at: DateTime<Utc>,
    /// Study session or exchange record the change derives from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause_id: Option<Uuid>,
}

/// Catalog category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub sort_order: i32,
}

/// Sentinel for unlimited stock or exchange limit.
pub const UNLIMITED: i64 = -1;

/// Redeemable catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub points_required: i64,
    /// `UNLIMITED` (-1) for unlimited stock.
    pub stock_quantity: i64,
    /// `UNLIMITED` (-1) for no per-user limit.
    pub exchange_limit_per_user: i64,
    pub requires_approval: bool,
    pub is_active: bool,
    pub sort_order: i32,
}

/// Exchange record status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl ExchangeStatus {
    pub const ALL: [ExchangeStatus; 4] = [
        Self::Pending,
        Self::Approved,
        Self::Rejected,
        Self::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// A redemption attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    pub points_spent: i64,
    pub status: ExchangeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
