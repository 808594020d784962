//! PostgreSQL database operations
//!
//! Pool-level reads live on [`Database`]. Anything that is part of a
//! multi-step write takes a `&mut PgConnection` so it can run inside the
//! caller's transaction.

pub mod catalog;
pub mod definitions;
pub mod ledger;
pub mod progress;

use sha2::{Digest, Sha256};
use sqlx::{postgres::PgPoolOptions, PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::User;

/// A transaction borrowed from the pool.
pub type Tx = Transaction<'static, Postgres>;

/// Database wrapper with connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL and create connection pool
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ApiError::Migration(e.to_string()))?;
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Start a transaction
    pub async fn begin(&self) -> Result<Tx> {
        Ok(self.pool.begin().await?)
    }

    // === User Repository ===

    /// Create a new user and return it with the plaintext token.
    ///
    /// The token is only ever returned here; the table keeps its hash.
    pub async fn create_user(&self, name: Option<&str>) -> Result<(User, String)> {
        let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, token_hash, name)
            VALUES ($1, $2, $3)
            RETURNING id, token_hash, name, created_at, last_seen_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(hash_token(&token))
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok((user, token))
    }

    /// Get user by bearer token
    pub async fn get_user_by_token(&self, token: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, token_hash, name, created_at, last_seen_at
            FROM users
            WHERE token_hash = $1
            "#,
        )
        .bind(hash_token(token))
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Get user by ID
    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, token_hash, name, created_at, last_seen_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Update user last_seen_at timestamp
    pub async fn update_last_seen(&self, user_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET last_seen_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Hex SHA-256 of a bearer token.
pub fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// Lock the user row for the rest of the transaction.
///
/// Every write that reads a user's balance or progress takes this lock
/// first, so events for one user apply one at a time.
pub async fn lock_user(conn: &mut PgConnection, user_id: Uuid) -> Result<()> {
    sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(())
}
