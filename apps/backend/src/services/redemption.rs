//! Catalog redemption and exchange review.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use rewards_core::{
    can_redeem, new_exchange, record_award, record_redemption, RedeemError, RedemptionContext,
};

use crate::db::{self, Database};
use crate::error::{ApiError, Result};
use crate::models::*;
use crate::services::retry::with_retry;

/// Redeem `quantity` units of a product for a user.
///
/// Stock is taken with a conditional update, so concurrent requests for the
/// last unit cannot both succeed. The balance check, the stock update, the
/// exchange record and the debit entry commit together or not at all.
pub async fn redeem(
    db: &Database,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i64,
    now: DateTime<Utc>,
) -> Result<RedeemResponse> {
    with_retry("redeem", move || redeem_once(db, user_id, product_id, quantity, now)).await
}

async fn redeem_once(
    db: &Database,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i64,
    now: DateTime<Utc>,
) -> Result<RedeemResponse> {
    let mut tx = db.begin().await?;
    db::lock_user(&mut tx, user_id).await?;

    let product = db::catalog::get_product(&mut tx, product_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;
    let context = RedemptionContext {
        balance: db::ledger::last_balance(&mut tx, user_id).await?,
        prior_quantity: db::catalog::prior_quantity(&mut tx, user_id, product_id).await?,
    };
    can_redeem(&product, quantity, context)?;

    if !db::catalog::decrement_stock(&mut tx, product_id, quantity).await? {
        // Someone else took the stock between our read and the update.
        let available = db::catalog::get_product(&mut tx, product_id)
            .await?
            .map(|p| p.stock_quantity.max(0))
            .unwrap_or(0);
        return Err(RedeemError::OutOfStock {
            available,
            requested: quantity,
        }
        .into());
    }

    let exchange = new_exchange(user_id, &product, quantity, now);
    db::catalog::insert_exchange(&mut tx, &exchange).await?;

    let balance = if exchange.points_spent > 0 {
        let entry = record_redemption(
            user_id,
            context.balance,
            product_id,
            exchange.points_spent,
            exchange.id,
            now,
        )?;
        db::ledger::insert_entry(&mut tx, &entry).await?;
        entry.balance_after
    } else {
        context.balance
    };

    tx.commit().await?;

    tracing::info!(
        user_id = %user_id,
        product_id = %product_id,
        exchange_id = %exchange.id,
        quantity,
        points_spent = exchange.points_spent,
        status = exchange.status.as_str(),
        "Redeemed product"
    );

    Ok(RedeemResponse { exchange, balance })
}

/// Move an exchange record to `to`.
///
/// Rejecting refunds the points and returns finite stock.
pub async fn review_exchange(
    db: &Database,
    exchange_id: Uuid,
    to: ExchangeStatus,
    note: Option<String>,
    now: DateTime<Utc>,
) -> Result<ExchangeRecord> {
    let note = note.as_deref();
    with_retry("review_exchange", move || {
        review_exchange_once(db, exchange_id, to, note, now)
    })
    .await
}

async fn review_exchange_once(
    db: &Database,
    exchange_id: Uuid,
    to: ExchangeStatus,
    note: Option<&str>,
    now: DateTime<Utc>,
) -> Result<ExchangeRecord> {
    let mut tx = db.begin().await?;

    let mut record = db::catalog::lock_exchange(&mut tx, exchange_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Exchange record not found".to_string()))?;
    let from = record.status;
    record.status = from.transition(to)?;

    if to == ExchangeStatus::Rejected {
        db::lock_user(&mut tx, record.user_id).await?;
        if record.points_spent > 0 {
            let last_balance = db::ledger::last_balance(&mut tx, record.user_id).await?;
            let refund = record_award(
                record.user_id,
                last_balance,
                Some(record.product_id),
                record.points_spent,
                LedgerKind::Refund,
                Some(record.id),
                now,
            )?;
            db::ledger::insert_entry(&mut tx, &refund).await?;
        }
        db::catalog::restore_stock(&mut tx, record.product_id, record.quantity).await?;
    }

    db::catalog::update_exchange_status(&mut tx, exchange_id, record.status, note, now).await?;
    tx.commit().await?;

    if let Some(note) = note {
        record.note = Some(note.to_string());
    }
    record.updated_at = now;

    tracing::info!(
        exchange_id = %exchange_id,
        from = from.as_str(),
        to = to.as_str(),
        "Reviewed exchange"
    );

    Ok(record)
}
