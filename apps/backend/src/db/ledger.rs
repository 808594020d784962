//! Points ledger

use sqlx::PgConnection;
use uuid::Uuid;

use super::Database;
use crate::error::Result;
use crate::models::*;

/// Balance after the user's latest entry, 0 when there is none
pub async fn last_balance(conn: &mut PgConnection, user_id: Uuid) -> Result<i64> {
    let balance = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT balance_after
        FROM points_ledger
        WHERE user_id = $1
        ORDER BY seq DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(balance.unwrap_or(0))
}

/// Append an entry. Entries are never updated or deleted.
pub async fn insert_entry(conn: &mut PgConnection, entry: &LedgerEntry) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO points_ledger (id, user_id, source_id, kind, points_delta, balance_after,
                                   cause_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(entry.id)
    .bind(entry.user_id)
    .bind(entry.source_id)
    .bind(entry.kind.as_str())
    .bind(entry.points_delta)
    .bind(entry.balance_after)
    .bind(entry.cause_id)
    .bind(entry.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

impl Database {
    /// Current balance for a user
    pub async fn get_balance(&self, user_id: Uuid) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        last_balance(&mut conn, user_id).await
    }

    /// Ledger entries, newest first
    pub async fn list_ledger_entries(&self, user_id: Uuid, limit: i64) -> Result<Vec<LedgerEntry>> {
        let entries = sqlx::query_as::<_, DbLedgerEntry>(
            r#"
            SELECT id, user_id, source_id, kind, points_delta, balance_after, cause_id, created_at
            FROM points_ledger
            WHERE user_id = $1
            ORDER BY seq DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries.iter().map(|e| e.to_core()).collect())
    }

    /// Every entry for a user, oldest first
    pub async fn full_ledger(&self, user_id: Uuid) -> Result<Vec<LedgerEntry>> {
        let entries = sqlx::query_as::<_, DbLedgerEntry>(
            r#"
            SELECT id, user_id, source_id, kind, points_delta, balance_after, cause_id, created_at
            FROM points_ledger
            WHERE user_id = $1
            ORDER BY seq
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries.iter().map(|e| e.to_core()).collect())
    }
}
