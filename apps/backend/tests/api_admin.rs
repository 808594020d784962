//! Admin API tests.
//!
//! These tests require a running PostgreSQL database.
//! Set DATABASE_URL environment variable before running.

mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::json;
use uuid::Uuid;

use common::fixtures;
use common::{TestContext, ADMIN_TOKEN};

/// Test admin routes require the operator token.
#[tokio::test]
#[ignore = "requires database"]
async fn test_admin_requires_token() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router()).unwrap();

    server
        .get("/api/admin/rules")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let response = server
        .get("/api/admin/rules")
        .add_header("x-admin-token", "wrong")
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    // A user token is not an admin token.
    let (user_id, token) = ctx.create_test_user(None).await;
    server
        .get("/api/admin/rules")
        .add_header(
            axum::http::header::AUTHORIZATION,
            TestContext::auth_header_value(&token),
        )
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    ctx.cleanup_user(user_id).await;
}

/// Test seeded rules are listed.
#[tokio::test]
#[ignore = "requires database"]
async fn test_list_seeded_rules() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router()).unwrap();

    let response = server
        .get("/api/admin/rules")
        .add_header("x-admin-token", ADMIN_TOKEN)
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let names: Vec<&str> = body["rules"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"Hourly study"));
    assert!(names.contains(&"Daily check-in"));
}

/// Test rule create, update and deactivate.
#[tokio::test]
#[ignore = "requires database"]
async fn test_rule_lifecycle() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router()).unwrap();

    let created = server
        .post("/api/admin/rules")
        .add_header("x-admin-token", ADMIN_TOKEN)
        .json(&fixtures::inactive_rule_request(
            json!({"type": "session_count", "count": 10}),
            15,
        ))
        .await;
    created.assert_status(StatusCode::CREATED);
    let created: serde_json::Value = created.json();
    let rule_id = Uuid::parse_str(created["id"].as_str().unwrap()).unwrap();
    assert_eq!(created["is_active"], false);

    let updated = server
        .put(&format!("/api/admin/rules/{}", rule_id))
        .add_header("x-admin-token", ADMIN_TOKEN)
        .json(&fixtures::inactive_rule_request(
            json!({"type": "session_count", "count": 20}),
            25,
        ))
        .await;
    updated.assert_status_ok();
    let updated: serde_json::Value = updated.json();
    assert_eq!(updated["reward_points"], 25);
    assert_eq!(updated["conditions"]["count"], 20);

    server
        .delete(&format!("/api/admin/rules/{}", rule_id))
        .add_header("x-admin-token", ADMIN_TOKEN)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    server
        .delete(&format!("/api/admin/rules/{}", Uuid::new_v4()))
        .add_header("x-admin-token", ADMIN_TOKEN)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    ctx.cleanup_rule(rule_id).await;
}

/// Test malformed conditions are rejected at write time.
#[tokio::test]
#[ignore = "requires database"]
async fn test_invalid_rule_rejected() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router()).unwrap();

    for conditions in [
        json!({"type": "moon_phase"}),
        json!({"type": "duration_total", "minutes": 0}),
        json!({"type": "efficiency_score", "min_percent": 150}),
        json!("duration_total"),
    ] {
        let response = server
            .post("/api/admin/rules")
            .add_header("x-admin-token", ADMIN_TOKEN)
            .json(&fixtures::inactive_rule_request(conditions, 10))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"], "validation_error");
    }
}

/// Test achievement create and deactivate.
#[tokio::test]
#[ignore = "requires database"]
async fn test_achievement_lifecycle() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router()).unwrap();

    let created = server
        .post("/api/admin/achievements")
        .add_header("x-admin-token", ADMIN_TOKEN)
        .json(&json!({
            "name": "Test achievement",
            "category": "tests",
            "conditions": {"type": "daily_frequency", "count": 2},
            "reward_points": 10,
            "required_count": 5,
            "is_active": false,
        }))
        .await;
    created.assert_status(StatusCode::CREATED);
    let created: serde_json::Value = created.json();
    let achievement_id = Uuid::parse_str(created["id"].as_str().unwrap()).unwrap();
    assert_eq!(created["required_count"], 5);

    let response = server
        .post("/api/admin/achievements")
        .add_header("x-admin-token", ADMIN_TOKEN)
        .json(&json!({
            "name": "Broken",
            "category": "tests",
            "conditions": {"type": "session_count", "count": 1},
            "required_count": 0,
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    server
        .delete(&format!("/api/admin/achievements/{}", achievement_id))
        .add_header("x-admin-token", ADMIN_TOKEN)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    ctx.cleanup_achievement(achievement_id).await;
}

/// Test bonus and expiry adjustments.
#[tokio::test]
#[ignore = "requires database"]
async fn test_adjust_points() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router()).unwrap();
    let (user_id, _) = ctx.create_test_user(None).await;
    let path = format!("/api/admin/users/{}/points", user_id);

    let response = server
        .post(&path)
        .add_header("x-admin-token", ADMIN_TOKEN)
        .json(&json!({ "kind": "bonus", "points": 40 }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["entry"]["balance_after"], 40);

    let response = server
        .post(&path)
        .add_header("x-admin-token", ADMIN_TOKEN)
        .json(&json!({ "kind": "expired", "points": 15 }))
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["entry"]["points_delta"], -15);
    assert_eq!(body["entry"]["balance_after"], 25);

    // Expiry cannot take the balance below zero.
    let response = server
        .post(&path)
        .add_header("x-admin-token", ADMIN_TOKEN)
        .json(&json!({ "kind": "expired", "points": 100 }))
        .await;
    response.assert_status(StatusCode::CONFLICT);

    // Earned entries only come from rules and achievements.
    server
        .post(&path)
        .add_header("x-admin-token", ADMIN_TOKEN)
        .json(&json!({ "kind": "earned", "points": 5 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .post(&format!("/api/admin/users/{}/points", Uuid::new_v4()))
        .add_header("x-admin-token", ADMIN_TOKEN)
        .json(&json!({ "kind": "bonus", "points": 5 }))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    assert_eq!(ctx.db.get_balance(user_id).await.unwrap(), 25);

    ctx.cleanup_user(user_id).await;
}

/// Test product management through the admin API.
#[tokio::test]
#[ignore = "requires database"]
async fn test_product_management() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router()).unwrap();

    let category = server
        .post("/api/admin/categories")
        .add_header("x-admin-token", ADMIN_TOKEN)
        .json(&json!({ "name": "Test category" }))
        .await;
    category.assert_status(StatusCode::CREATED);
    let category: serde_json::Value = category.json();
    let category_id = Uuid::parse_str(category["id"].as_str().unwrap()).unwrap();

    let mut request = fixtures::product_request(25, 10, 2, false);
    request.category_id = Some(category_id);
    let created = server
        .post("/api/admin/products")
        .add_header("x-admin-token", ADMIN_TOKEN)
        .json(&request)
        .await;
    created.assert_status(StatusCode::CREATED);
    let created: serde_json::Value = created.json();
    let product_id = Uuid::parse_str(created["id"].as_str().unwrap()).unwrap();

    request.stock_quantity = 4;
    request.is_active = false;
    let updated = server
        .put(&format!("/api/admin/products/{}", product_id))
        .add_header("x-admin-token", ADMIN_TOKEN)
        .json(&request)
        .await;
    updated.assert_status_ok();
    let updated: serde_json::Value = updated.json();
    assert_eq!(updated["stock_quantity"], 4);
    assert_eq!(updated["is_active"], false);

    let listed = server
        .get(&format!("/api/admin/products?category_id={}", category_id))
        .add_header("x-admin-token", ADMIN_TOKEN)
        .await;
    let listed: serde_json::Value = listed.json();
    assert_eq!(listed["products"].as_array().unwrap().len(), 1);

    ctx.cleanup_product(product_id).await;
    let _ = sqlx::query("DELETE FROM product_categories WHERE id = $1")
        .bind(category_id)
        .execute(ctx.db.pool())
        .await;
}
