//! Common test utilities and fixtures for integration tests.
//!
//! This module provides shared test infrastructure including:
//! - TestContext for setting up test environment with database
//! - Helper functions for creating test data
//! - Authentication helpers
//!
//! # Requirements
//! Integration tests require a PostgreSQL database (set DATABASE_URL env var).
//! Migrations seed the default rules and achievements, so expected point
//! totals in these tests follow the seeded definitions.

#![allow(dead_code)]

pub mod fixtures;

use std::sync::Arc;

use axum::Router;
use chrono::{Duration, NaiveDate, Utc};
use uuid::Uuid;

use rewards_core::SystemClock;
use study_rewards_backend::config::Config;
use study_rewards_backend::db::Database;
use study_rewards_backend::models::{LedgerKind, Product, UpsertProductRequest};
use study_rewards_backend::services::rewards;
use study_rewards_backend::{build_router, AppState};

/// Operator token the test router is configured with.
pub const ADMIN_TOKEN: &str = "test-admin-token";

/// Test context containing database connection and test server.
///
/// Use this to set up integration tests with a real database connection.
/// Requires DATABASE_URL environment variable to be set.
pub struct TestContext {
    pub db: Arc<Database>,
    app: Router,
}

impl TestContext {
    /// Create a new test context.
    ///
    /// # Panics
    /// Panics if DATABASE_URL is not set or database connection fails.
    pub async fn new() -> Self {
        dotenvy::dotenv().ok();

        let database_url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");

        let db = Database::connect(&database_url, 5)
            .await
            .expect("Failed to connect to test database");

        db.run_migrations()
            .await
            .expect("Failed to run migrations");

        let db = Arc::new(db);

        let config = Config {
            database_url,
            host: "127.0.0.1".to_string(),
            port: 0,
            admin_token: ADMIN_TOKEN.to_string(),
            daily_reset_hour: 0,
            efficiency_window: 7,
            max_connections: 5,
        };
        let state = AppState::new(db.clone(), config, Arc::new(SystemClock));
        let app = build_router(state);

        Self { db, app }
    }

    /// Get the router for use with axum-test.
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    /// Create a test user and return its ID and token.
    pub async fn create_test_user(&self, name: Option<&str>) -> (Uuid, String) {
        let (user, token) = self
            .db
            .create_user(name)
            .await
            .expect("Failed to create test user");
        (user.id, token)
    }

    /// Create a product directly in the database.
    pub async fn create_product(&self, request: &UpsertProductRequest) -> Product {
        self.db
            .create_product(request)
            .await
            .expect("Failed to create test product")
    }

    /// Credit a bonus so the user can redeem.
    pub async fn grant_points(&self, user_id: Uuid, points: i64) {
        rewards::adjust_points(&self.db, user_id, LedgerKind::Bonus, points, Utc::now())
            .await
            .expect("Failed to grant points");
    }

    /// Format authorization header value.
    pub fn auth_header_value(token: &str) -> String {
        format!("Bearer {}", token)
    }

    /// A study day far enough in the past not to collide with the clock.
    pub fn past_day(days_ago: i64) -> NaiveDate {
        Utc::now().date_naive() - Duration::days(days_ago)
    }

    /// Clean up test data for a user.
    ///
    /// Sessions, progress, achievements, ledger entries and exchanges all
    /// cascade from the user row.
    pub async fn cleanup_user(&self, user_id: Uuid) {
        let _ = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(self.db.pool())
            .await;
    }

    /// Clean up a product and any exchanges that reference it.
    pub async fn cleanup_product(&self, product_id: Uuid) {
        let _ = sqlx::query("DELETE FROM exchange_records WHERE product_id = $1")
            .bind(product_id)
            .execute(self.db.pool())
            .await;

        let _ = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id)
            .execute(self.db.pool())
            .await;
    }

    /// Clean up an admin-created rule.
    pub async fn cleanup_rule(&self, rule_id: Uuid) {
        let _ = sqlx::query("DELETE FROM point_rules WHERE id = $1")
            .bind(rule_id)
            .execute(self.db.pool())
            .await;
    }

    /// Clean up an admin-created achievement.
    pub async fn cleanup_achievement(&self, achievement_id: Uuid) {
        let _ = sqlx::query("DELETE FROM user_achievements WHERE achievement_id = $1")
            .bind(achievement_id)
            .execute(self.db.pool())
            .await;

        let _ = sqlx::query("DELETE FROM achievements WHERE id = $1")
            .bind(achievement_id)
            .execute(self.db.pool())
            .await;
    }
}
