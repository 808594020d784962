//! Admin endpoints: rule, achievement and catalog management, exchange
//! review and manual point adjustments.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use rewards_core::{Achievement, RewardRule};

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::routes::catalog::parse_status;
use crate::services::{redemption, rewards};
use crate::AppState;

/// Reject a rule definition the evaluator could not run
fn validate_rule(rule: &UpsertRuleRequest) -> Result<()> {
    RewardRule::try_from(RuleConfig {
        id: Uuid::nil(),
        name: rule.name.clone(),
        description: rule.description.clone(),
        conditions: rule.conditions.clone(),
        reward_points: rule.reward_points,
        level: rule.level,
        is_active: rule.is_active,
        sort_order: rule.sort_order,
    })?;
    Ok(())
}

/// Reject an achievement definition the evaluator could not run
fn validate_achievement(achievement: &UpsertAchievementRequest) -> Result<()> {
    Achievement::try_from(AchievementConfig {
        id: Uuid::nil(),
        name: achievement.name.clone(),
        description: achievement.description.clone(),
        category: achievement.category.clone(),
        conditions: achievement.conditions.clone(),
        reward_points: achievement.reward_points,
        level: achievement.level,
        required_count: achievement.required_count,
        is_active: achievement.is_active,
        sort_order: achievement.sort_order,
    })?;
    Ok(())
}

fn validate_product(product: &UpsertProductRequest) -> Result<()> {
    if product.points_required < 0 {
        return Err(ApiError::BadRequest(
            "points_required must not be negative".to_string(),
        ));
    }
    if product.stock_quantity < -1 || product.exchange_limit_per_user < -1 {
        return Err(ApiError::BadRequest(
            "stock_quantity and exchange_limit_per_user must be -1 or more".to_string(),
        ));
    }
    Ok(())
}

// === Rules ===

/// GET /api/admin/rules
pub async fn list_rules(State(state): State<AppState>) -> Result<Json<RuleListResponse>> {
    let rules = state.db.list_rules().await?;
    Ok(Json(RuleListResponse { rules }))
}

/// POST /api/admin/rules
pub async fn create_rule(
    State(state): State<AppState>,
    Json(payload): Json<UpsertRuleRequest>,
) -> Result<(StatusCode, Json<DbPointRule>)> {
    validate_rule(&payload)?;
    let rule = state.db.create_rule(&payload).await?;
    tracing::info!("Created points rule {} ({})", rule.id, rule.name);
    Ok((StatusCode::CREATED, Json(rule)))
}

/// PUT /api/admin/rules/:id
pub async fn update_rule(
    State(state): State<AppState>,
    Path(rule_id): Path<Uuid>,
    Json(payload): Json<UpsertRuleRequest>,
) -> Result<Json<DbPointRule>> {
    validate_rule(&payload)?;
    let rule = state
        .db
        .update_rule(rule_id, &payload)
        .await?
        .ok_or_else(|| ApiError::NotFound("Rule not found".to_string()))?;
    tracing::info!("Updated points rule {}", rule.id);
    Ok(Json(rule))
}

/// DELETE /api/admin/rules/:id
/// Deactivates the rule; past awards keep referring to it
pub async fn deactivate_rule(
    State(state): State<AppState>,
    Path(rule_id): Path<Uuid>,
) -> Result<StatusCode> {
    if !state.db.deactivate_rule(rule_id).await? {
        return Err(ApiError::NotFound("Rule not found".to_string()));
    }
    tracing::info!("Deactivated points rule {}", rule_id);
    Ok(StatusCode::NO_CONTENT)
}

// === Achievements ===

/// GET /api/admin/achievements
pub async fn list_achievements(
    State(state): State<AppState>,
) -> Result<Json<AdminAchievementListResponse>> {
    let achievements = state.db.list_achievements().await?;
    Ok(Json(AdminAchievementListResponse { achievements }))
}

/// POST /api/admin/achievements
pub async fn create_achievement(
    State(state): State<AppState>,
    Json(payload): Json<UpsertAchievementRequest>,
) -> Result<(StatusCode, Json<DbAchievement>)> {
    validate_achievement(&payload)?;
    let achievement = state.db.create_achievement(&payload).await?;
    tracing::info!("Created achievement {} ({})", achievement.id, achievement.name);
    Ok((StatusCode::CREATED, Json(achievement)))
}

/// PUT /api/admin/achievements/:id
pub async fn update_achievement(
    State(state): State<AppState>,
    Path(achievement_id): Path<Uuid>,
    Json(payload): Json<UpsertAchievementRequest>,
) -> Result<Json<DbAchievement>> {
    validate_achievement(&payload)?;
    let achievement = state
        .db
        .update_achievement(achievement_id, &payload)
        .await?
        .ok_or_else(|| ApiError::NotFound("Achievement not found".to_string()))?;
    tracing::info!("Updated achievement {}", achievement.id);
    Ok(Json(achievement))
}

/// DELETE /api/admin/achievements/:id
pub async fn deactivate_achievement(
    State(state): State<AppState>,
    Path(achievement_id): Path<Uuid>,
) -> Result<StatusCode> {
    if !state.db.deactivate_achievement(achievement_id).await? {
        return Err(ApiError::NotFound("Achievement not found".to_string()));
    }
    tracing::info!("Deactivated achievement {}", achievement_id);
    Ok(StatusCode::NO_CONTENT)
}

// === Catalog ===

/// GET /api/admin/categories
/// Includes inactive categories
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<CategoryListResponse>> {
    let categories = state.db.list_categories(false).await?;
    Ok(Json(CategoryListResponse { categories }))
}

/// POST /api/admin/categories
pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<UpsertCategoryRequest>,
) -> Result<(StatusCode, Json<Category>)> {
    let category = state.db.create_category(&payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /api/admin/categories/:id
pub async fn update_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
    Json(payload): Json<UpsertCategoryRequest>,
) -> Result<Json<Category>> {
    let category = state
        .db
        .update_category(category_id, &payload)
        .await?
        .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))?;
    Ok(Json(category))
}

/// GET /api/admin/products
/// Includes inactive products
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ProductListResponse>> {
    let products = state.db.list_products(query.category_id, false).await?;
    Ok(Json(ProductListResponse { products }))
}

/// POST /api/admin/products
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<UpsertProductRequest>,
) -> Result<(StatusCode, Json<Product>)> {
    validate_product(&payload)?;
    let product = state.db.create_product(&payload).await?;
    tracing::info!("Created product {} ({})", product.id, product.name);
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /api/admin/products/:id
pub async fn update_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpsertProductRequest>,
) -> Result<Json<Product>> {
    validate_product(&payload)?;
    let product = state
        .db
        .update_product(product_id, &payload)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;
    tracing::info!("Updated product {}", product.id);
    Ok(Json(product))
}

// === Exchanges ===

/// GET /api/admin/exchanges
pub async fn list_exchanges(
    State(state): State<AppState>,
    Query(query): Query<ExchangeListQuery>,
) -> Result<Json<ExchangeListResponse>> {
    let status = parse_status(query.status.as_deref())?;
    let exchanges = state.db.list_exchanges(None, status).await?;
    Ok(Json(ExchangeListResponse { exchanges }))
}

async fn review(
    state: AppState,
    exchange_id: Uuid,
    to: ExchangeStatus,
    payload: Option<ReviewExchangeRequest>,
) -> Result<Json<ExchangeRecord>> {
    let note = payload.and_then(|p| p.note);
    let record =
        redemption::review_exchange(&state.db, exchange_id, to, note, state.clock.now()).await?;
    Ok(Json(record))
}

/// POST /api/admin/exchanges/:id/approve
pub async fn approve_exchange(
    State(state): State<AppState>,
    Path(exchange_id): Path<Uuid>,
    Json(payload): Json<Option<ReviewExchangeRequest>>,
) -> Result<Json<ExchangeRecord>> {
    review(state, exchange_id, ExchangeStatus::Approved, payload).await
}

/// POST /api/admin/exchanges/:id/reject
/// Refunds the points and returns the stock
pub async fn reject_exchange(
    State(state): State<AppState>,
    Path(exchange_id): Path<Uuid>,
    Json(payload): Json<Option<ReviewExchangeRequest>>,
) -> Result<Json<ExchangeRecord>> {
    review(state, exchange_id, ExchangeStatus::Rejected, payload).await
}

/// POST /api/admin/exchanges/:id/complete
pub async fn complete_exchange(
    State(state): State<AppState>,
    Path(exchange_id): Path<Uuid>,
    Json(payload): Json<Option<ReviewExchangeRequest>>,
) -> Result<Json<ExchangeRecord>> {
    review(state, exchange_id, ExchangeStatus::Completed, payload).await
}

// === Points ===

/// POST /api/admin/users/:id/points
pub async fn adjust_points(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<AdjustPointsRequest>,
) -> Result<(StatusCode, Json<AdjustPointsResponse>)> {
    let entry = rewards::adjust_points(
        &state.db,
        user_id,
        payload.kind,
        payload.points,
        state.clock.now(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(AdjustPointsResponse { entry })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(conditions: serde_json::Value, reward_points: i64) -> UpsertRuleRequest {
        UpsertRuleRequest {
            name: "Hourly".to_string(),
            description: String::new(),
            conditions,
            reward_points,
            level: None,
            is_active: true,
            sort_order: 0,
        }
    }

    #[test]
    fn valid_rule_accepted() {
        let r = rule(json!({"type": "duration_total", "minutes": 60}), 10);
        assert!(validate_rule(&r).is_ok());
    }

    #[test]
    fn unknown_condition_rejected() {
        let r = rule(json!({"type": "moon_phase", "phase": "full"}), 10);
        assert!(matches!(validate_rule(&r), Err(ApiError::Validation(_))));
    }

    #[test]
    fn non_positive_reward_rejected() {
        let r = rule(json!({"type": "session_count", "count": 5}), 0);
        assert!(validate_rule(&r).is_err());
    }

    #[test]
    fn product_with_bad_stock_rejected() {
        let product = UpsertProductRequest {
            category_id: None,
            name: "Badge".to_string(),
            description: String::new(),
            points_required: 10,
            stock_quantity: -5,
            exchange_limit_per_user: -1,
            requires_approval: false,
            is_active: true,
            sort_order: 0,
        };
        assert!(validate_product(&product).is_err());
    }
}
