//! Product catalog and exchange records

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use super::Database;
use crate::error::Result;
use crate::models::*;

const PRODUCT_COLUMNS: &str = "id, category_id, name, description, points_required, \
     stock_quantity, exchange_limit_per_user, requires_approval, is_active, sort_order";

const EXCHANGE_COLUMNS: &str =
    "id, user_id, product_id, quantity, points_spent, status, note, created_at, updated_at";

/// Get a product by ID
pub async fn get_product(conn: &mut PgConnection, product_id: Uuid) -> Result<Option<Product>> {
    let product = sqlx::query_as::<_, DbProduct>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
    ))
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(product.map(|p| p.to_core()))
}

/// Take `quantity` units of stock.
///
/// The check and the decrement are one statement, so two requests for the
/// last unit cannot both succeed. Returns `false` when stock ran out.
pub async fn decrement_stock(
    conn: &mut PgConnection,
    product_id: Uuid,
    quantity: i64,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock_quantity = CASE WHEN stock_quantity = -1 THEN -1
                                  ELSE stock_quantity - $2 END,
            updated_at = NOW()
        WHERE id = $1 AND (stock_quantity = -1 OR stock_quantity >= $2)
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Return `quantity` units to finite stock
pub async fn restore_stock(conn: &mut PgConnection, product_id: Uuid, quantity: i64) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE products
        SET stock_quantity = stock_quantity + $2, updated_at = NOW()
        WHERE id = $1 AND stock_quantity <> -1
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Quantity of a product the user already holds or has requested
pub async fn prior_quantity(conn: &mut PgConnection, user_id: Uuid, product_id: Uuid) -> Result<i64> {
    let quantity = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COALESCE(SUM(quantity), 0)::BIGINT
        FROM exchange_records
        WHERE user_id = $1 AND product_id = $2 AND status = ANY($3)
        "#,
    )
    .bind(user_id)
    .bind(product_id)
    .bind(ExchangeStatus::limit_statuses())
    .fetch_one(&mut *conn)
    .await?;

    Ok(quantity)
}

/// Insert a new exchange record
pub async fn insert_exchange(conn: &mut PgConnection, record: &ExchangeRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO exchange_records (id, user_id, product_id, quantity, points_spent, status,
                                      note, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(record.id)
    .bind(record.user_id)
    .bind(record.product_id)
    .bind(record.quantity)
    .bind(record.points_spent)
    .bind(record.status.as_str())
    .bind(&record.note)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Get an exchange record and lock it for the rest of the transaction
pub async fn lock_exchange(
    conn: &mut PgConnection,
    exchange_id: Uuid,
) -> Result<Option<ExchangeRecord>> {
    let record = sqlx::query_as::<_, DbExchangeRecord>(&format!(
        "SELECT {EXCHANGE_COLUMNS} FROM exchange_records WHERE id = $1 FOR UPDATE"
    ))
    .bind(exchange_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(record.map(|r| r.to_core()))
}

/// Persist a status change
pub async fn update_exchange_status(
    conn: &mut PgConnection,
    exchange_id: Uuid,
    status: ExchangeStatus,
    note: Option<&str>,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE exchange_records
        SET status = $2, note = COALESCE($3, note), updated_at = $4
        WHERE id = $1
        "#,
    )
    .bind(exchange_id)
    .bind(status.as_str())
    .bind(note)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

impl Database {
    // === Category Repository ===

    pub async fn list_categories(&self, active_only: bool) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, DbCategory>(
            r#"
            SELECT id, name, description, is_active, sort_order
            FROM product_categories
            WHERE is_active OR NOT $1
            ORDER BY sort_order, name
            "#,
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories.iter().map(|c| c.to_core()).collect())
    }

    pub async fn create_category(&self, category: &UpsertCategoryRequest) -> Result<Category> {
        let category = sqlx::query_as::<_, DbCategory>(
            r#"
            INSERT INTO product_categories (id, name, description, is_active, sort_order)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, description, is_active, sort_order
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.is_active)
        .bind(category.sort_order)
        .fetch_one(&self.pool)
        .await?;

        Ok(category.to_core())
    }

    pub async fn update_category(
        &self,
        category_id: Uuid,
        category: &UpsertCategoryRequest,
    ) -> Result<Option<Category>> {
        let category = sqlx::query_as::<_, DbCategory>(
            r#"
            UPDATE product_categories SET
                name = $2,
                description = $3,
                is_active = $4,
                sort_order = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, is_active, sort_order
            "#,
        )
        .bind(category_id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.is_active)
        .bind(category.sort_order)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category.map(|c| c.to_core()))
    }

    // === Product Repository ===

    pub async fn list_products(
        &self,
        category_id: Option<Uuid>,
        active_only: bool,
    ) -> Result<Vec<Product>> {
        let products = sqlx::query_as::<_, DbProduct>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE ($1::UUID IS NULL OR category_id = $1)
              AND (is_active OR NOT $2)
            ORDER BY sort_order, name
            "#
        ))
        .bind(category_id)
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(products.iter().map(|p| p.to_core()).collect())
    }

    pub async fn get_product(&self, product_id: Uuid) -> Result<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        get_product(&mut conn, product_id).await
    }

    pub async fn create_product(&self, product: &UpsertProductRequest) -> Result<Product> {
        let product = sqlx::query_as::<_, DbProduct>(&format!(
            r#"
            INSERT INTO products (id, category_id, name, description, points_required,
                                  stock_quantity, exchange_limit_per_user, requires_approval,
                                  is_active, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(product.category_id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.points_required)
        .bind(product.stock_quantity)
        .bind(product.exchange_limit_per_user)
        .bind(product.requires_approval)
        .bind(product.is_active)
        .bind(product.sort_order)
        .fetch_one(&self.pool)
        .await?;

        Ok(product.to_core())
    }

    pub async fn update_product(
        &self,
        product_id: Uuid,
        product: &UpsertProductRequest,
    ) -> Result<Option<Product>> {
        let product = sqlx::query_as::<_, DbProduct>(&format!(
            r#"
            UPDATE products SET
                category_id = $2,
                name = $3,
                description = $4,
                points_required = $5,
                stock_quantity = $6,
                exchange_limit_per_user = $7,
                requires_approval = $8,
                is_active = $9,
                sort_order = $10,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(product_id)
        .bind(product.category_id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.points_required)
        .bind(product.stock_quantity)
        .bind(product.exchange_limit_per_user)
        .bind(product.requires_approval)
        .bind(product.is_active)
        .bind(product.sort_order)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product.map(|p| p.to_core()))
    }

    // === Exchange Repository ===

    /// Exchange records, newest first, optionally for one user and status
    pub async fn list_exchanges(
        &self,
        user_id: Option<Uuid>,
        status: Option<ExchangeStatus>,
    ) -> Result<Vec<ExchangeRecord>> {
        let records = sqlx::query_as::<_, DbExchangeRecord>(&format!(
            r#"
            SELECT {EXCHANGE_COLUMNS}
            FROM exchange_records
            WHERE ($1::UUID IS NULL OR user_id = $1)
              AND ($2::TEXT IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        Ok(records.iter().map(|r| r.to_core()).collect())
    }
}
