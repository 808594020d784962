//! Test fixtures and factory functions for creating test data.

use chrono::NaiveDate;
use serde_json::{json, Value};
use uuid::Uuid;

use study_rewards_backend::models::UpsertProductRequest;

/// Points a fresh user earns from one session of at least an hour, under
/// the seeded definitions: hourly study (10), daily check-in (5),
/// First Steps (5) and Focused Hour (10).
pub const FIRST_HOUR_POINTS: i64 = 30;

/// Request body for a plain session.
pub fn session_request(minutes: i64, date: NaiveDate) -> Value {
    json!({
        "date": date,
        "duration_minutes": minutes,
    })
}

/// Request body for a session with a client-chosen id.
pub fn session_request_with_id(id: Uuid, minutes: i64, date: NaiveDate) -> Value {
    json!({
        "id": id,
        "date": date,
        "duration_minutes": minutes,
    })
}

/// Request body for a session that finishes a project.
pub fn project_session_request(project_id: Uuid, minutes: i64, date: NaiveDate) -> Value {
    json!({
        "project_id": project_id,
        "date": date,
        "duration_minutes": minutes,
        "completes_project": true,
    })
}

/// Product with the given price, stock and per-user limit.
pub fn product_request(
    points_required: i64,
    stock_quantity: i64,
    exchange_limit_per_user: i64,
    requires_approval: bool,
) -> UpsertProductRequest {
    UpsertProductRequest {
        category_id: None,
        name: format!("Test product {}", Uuid::new_v4()),
        description: "Integration test product".to_string(),
        points_required,
        stock_quantity,
        exchange_limit_per_user,
        requires_approval,
        is_active: true,
        sort_order: 0,
    }
}

/// Inactive rule, so it never fires for other tests sharing the database.
pub fn inactive_rule_request(conditions: Value, reward_points: i64) -> Value {
    json!({
        "name": "Test rule",
        "conditions": conditions,
        "reward_points": reward_points,
        "is_active": false,
    })
}

pub fn redeem_request(product_id: Uuid, quantity: i64) -> Value {
    json!({
        "product_id": product_id,
        "quantity": quantity,
    })
}
