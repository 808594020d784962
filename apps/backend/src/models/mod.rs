//! Database models and API types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// Re-export shared types from rewards-core
pub use rewards_core::types::{
    AchievementConfig, Category, ExchangeRecord, ExchangeStatus, LedgerEntry, LedgerKind, Product,
    ProgressKey, ProgressKind, ProgressRecord, RuleConfig, StudySession, UserAchievementState,
};
pub use rewards_core::{AchievementChange, Award};

// === Database Entity Types ===

/// Registered user. Only the SHA-256 digest of the token is stored.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

/// Study session stored in PostgreSQL
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbStudySession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Option<Uuid>,
    pub study_date: NaiveDate,
    pub duration_minutes: i64,
    pub completes_project: bool,
    pub efficiency_percent: Option<i64>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DbStudySession {
    /// Convert to rewards-core StudySession
    pub fn to_core(&self) -> StudySession {
        StudySession {
            id: self.id,
            user_id: self.user_id,
            project_id: self.project_id,
            date: self.study_date,
            duration_minutes: self.duration_minutes,
            completes_project: self.completes_project,
            efficiency_percent: self.efficiency_percent,
        }
    }
}

/// Progress record in PostgreSQL (nil target_id = user-wide)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbProgressRecord {
    pub user_id: Uuid,
    pub kind: String,
    pub target_id: Uuid,
    pub current_value: i64,
    pub target_value: i64,
    pub last_updated: Option<NaiveDate>,
    pub updated_at: DateTime<Utc>,
}

impl DbProgressRecord {
    /// Create from rewards-core ProgressRecord
    pub fn from_core(record: &ProgressRecord) -> Self {
        Self {
            user_id: record.user_id,
            kind: record.key.kind.as_str().to_string(),
            target_id: record.key.target_id.unwrap_or_else(Uuid::nil),
            current_value: record.current_value,
            target_value: record.target_value,
            last_updated: record.last_updated,
            updated_at: record.updated_at,
        }
    }

    /// Convert to rewards-core ProgressRecord, `None` for unknown kinds
    pub fn to_core(&self) -> Option<ProgressRecord> {
        let kind = ProgressKind::from_str(&self.kind)?;
        let key = if self.target_id.is_nil() {
            ProgressKey::user(kind)
        } else {
            ProgressKey::scoped(kind, self.target_id)
        };
        Some(ProgressRecord {
            user_id: self.user_id,
            key,
            current_value: self.current_value,
            target_value: self.target_value,
            last_updated: self.last_updated,
            updated_at: self.updated_at,
        })
    }
}

/// Points rule in PostgreSQL
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbPointRule {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub conditions: serde_json::Value,
    pub reward_points: i64,
    pub level: Option<i32>,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbPointRule {
    pub fn to_config(&self) -> RuleConfig {
        RuleConfig {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            conditions: self.conditions.clone(),
            reward_points: self.reward_points,
            level: self.level,
            is_active: self.is_active,
            sort_order: self.sort_order,
        }
    }
}

/// Achievement definition in PostgreSQL
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbAchievement {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub conditions: serde_json::Value,
    pub reward_points: i64,
    pub level: Option<i32>,
    pub required_count: i64,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbAchievement {
    pub fn to_config(&self) -> AchievementConfig {
        AchievementConfig {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            conditions: self.conditions.clone(),
            reward_points: self.reward_points,
            level: self.level,
            required_count: self.required_count,
            is_active: self.is_active,
            sort_order: self.sort_order,
        }
    }
}

/// Per-user achievement progress in PostgreSQL
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbUserAchievement {
    pub user_id: Uuid,
    pub achievement_id: Uuid,
    pub current_progress: i64,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl DbUserAchievement {
    pub fn to_core(&self) -> UserAchievementState {
        UserAchievementState {
            user_id: self.user_id,
            achievement_id: self.achievement_id,
            current_progress: self.current_progress,
            is_completed: self.is_completed,
            completed_at: self.completed_at,
        }
    }
}

/// Ledger entry in PostgreSQL
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbLedgerEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub source_id: Option<Uuid>,
    pub kind: String,
    pub points_delta: i64,
    pub balance_after: i64,
    pub cause_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl DbLedgerEntry {
    pub fn to_core(&self) -> LedgerEntry {
        LedgerEntry {
            id: self.id,
            user_id: self.user_id,
            source_id: self.source_id,
            // The kind column is constrained by a CHECK.
            kind: LedgerKind::from_str(&self.kind).unwrap_or(LedgerKind::Earned),
            points_delta: self.points_delta,
            balance_after: self.balance_after,
            created_at: self.created_at,
            cause_id: self.cause_id,
        }
    }
}

/// Product category in PostgreSQL
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbCategory {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub sort_order: i32,
}

impl DbCategory {
    pub fn to_core(&self) -> Category {
        Category {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            is_active: self.is_active,
            sort_order: self.sort_order,
        }
    }
}

/// Product in PostgreSQL
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbProduct {
    pub id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub points_required: i64,
    pub stock_quantity: i64,
    pub exchange_limit_per_user: i64,
    pub requires_approval: bool,
    pub is_active: bool,
    pub sort_order: i32,
}

impl DbProduct {
    pub fn to_core(&self) -> Product {
        Product {
            id: self.id,
            category_id: self.category_id,
            name: self.name.clone(),
            description: self.description.clone(),
            points_required: self.points_required,
            stock_quantity: self.stock_quantity,
            exchange_limit_per_user: self.exchange_limit_per_user,
            requires_approval: self.requires_approval,
            is_active: self.is_active,
            sort_order: self.sort_order,
        }
    }
}

/// Exchange record in PostgreSQL
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbExchangeRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    pub points_spent: i64,
    pub status: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbExchangeRecord {
    pub fn to_core(&self) -> ExchangeRecord {
        ExchangeRecord {
            id: self.id,
            user_id: self.user_id,
            product_id: self.product_id,
            quantity: self.quantity,
            points_spent: self.points_spent,
            // The status column is constrained by a CHECK.
            status: ExchangeStatus::from_str(&self.status).unwrap_or(ExchangeStatus::Pending),
            note: self.note.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Minutes and sessions on one study day
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub minutes: i64,
    pub sessions: i64,
}

// === API Request/Response Types ===

fn default_true() -> bool {
    true
}

fn default_one() -> i64 {
    1
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserStatusResponse {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub balance: i64,
    pub last_seen_at: DateTime<Utc>,
}

// Study types
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitSessionRequest {
    /// Client-generated id; resubmitting it is treated as a replay.
    pub id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub duration_minutes: i64,
    #[serde(default)]
    pub completes_project: bool,
    pub efficiency_percent: Option<i64>,
    pub note: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitSessionResponse {
    pub session_id: Uuid,
    /// The session id had already been processed; nothing changed.
    pub duplicate: bool,
    pub progress: Vec<ProgressRecord>,
    pub awards: Vec<Award>,
    pub achievements: Vec<AchievementChange>,
    pub points_earned: i64,
    pub balance: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionListResponse {
    pub sessions: Vec<DbStudySession>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StudyStatsQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StudyStatsResponse {
    pub total_minutes: i64,
    pub total_sessions: i64,
    pub current_streak: i64,
    pub projects_completed: i64,
    pub average_efficiency: Option<i64>,
    pub minutes_today: i64,
    pub calendar: Vec<CalendarDay>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub records: Vec<ProgressRecord>,
}

/// Achievement definition joined with the user's state
#[derive(Debug, Serialize, Deserialize)]
pub struct AchievementView {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub conditions: serde_json::Value,
    pub reward_points: i64,
    pub level: Option<i32>,
    pub required_count: i64,
    pub current_progress: i64,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AchievementListResponse {
    pub achievements: Vec<AchievementView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PointsResponse {
    pub balance: i64,
    pub entries: Vec<LedgerEntry>,
}

// Catalog types
#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryListResponse {
    pub categories: Vec<Category>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductQuery {
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductListResponse {
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RedeemRequest {
    pub product_id: Uuid,
    #[serde(default = "default_one")]
    pub quantity: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RedeemResponse {
    pub exchange: ExchangeRecord,
    pub balance: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExchangeListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExchangeListResponse {
    pub exchanges: Vec<ExchangeRecord>,
}

// Admin types
#[derive(Debug, Serialize, Deserialize)]
pub struct UpsertRuleRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub conditions: serde_json::Value,
    pub reward_points: i64,
    pub level: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RuleListResponse {
    pub rules: Vec<DbPointRule>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpsertAchievementRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub conditions: serde_json::Value,
    #[serde(default)]
    pub reward_points: i64,
    pub level: Option<i32>,
    #[serde(default = "default_one")]
    pub required_count: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminAchievementListResponse {
    pub achievements: Vec<DbAchievement>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpsertCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpsertProductRequest {
    pub category_id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub points_required: i64,
    #[serde(default = "unlimited")]
    pub stock_quantity: i64,
    #[serde(default = "unlimited")]
    pub exchange_limit_per_user: i64,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i32,
}

fn unlimited() -> i64 {
    rewards_core::UNLIMITED
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewExchangeRequest {
    pub note: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdjustPointsRequest {
    /// `bonus` or `expired`
    pub kind: LedgerKind,
    /// Magnitude of the adjustment; the sign follows the kind.
    pub points: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdjustPointsResponse {
    pub entry: LedgerEntry,
}
