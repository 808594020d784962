//! Award ledger.
//!
//! Append-only point history. A user's balance is the `balance_after` of
//! their latest entry, which must always equal the running sum of deltas.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::LedgerError;
use crate::types::{LedgerEntry, LedgerKind};

/// Build the next entry for a user whose latest balance is `last_balance`.
///
/// Credit kinds need a positive delta and debit kinds a negative one. A debit
/// that would take the balance below zero fails with `InsufficientPoints`.
pub fn record_award(
    user_id: Uuid,
    last_balance: i64,
    source_id: Option<Uuid>,
    points_delta: i64,
    kind: LedgerKind,
    cause_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> Result<LedgerEntry, LedgerError> {
    let valid_sign = if kind.is_debit() {
        points_delta < 0
    } else {
        points_delta > 0
    };
    if !valid_sign {
        return Err(LedgerError::InvalidDelta {
            kind: kind.as_str(),
            delta: points_delta,
        });
    }

    let balance_after = last_balance
        .checked_add(points_delta)
        .ok_or(LedgerError::Overflow {
            balance: last_balance,
            delta: points_delta,
        })?;
    if balance_after < 0 {
        return Err(LedgerError::InsufficientPoints {
            balance: last_balance,
            required: -points_delta,
        });
    }

    Ok(LedgerEntry {
        id: Uuid::new_v4(),
        user_id,
        source_id,
        kind,
        points_delta,
        balance_after,
        created_at: now,
        cause_id,
    })
}

/// Debit entry for spending `points_cost` on a product.
pub fn record_redemption(
    user_id: Uuid,
    last_balance: i64,
    product_id: Uuid,
    points_cost: i64,
    exchange_id: Uuid,
    now: DateTime<Utc>,
) -> Result<LedgerEntry, LedgerError> {
    if last_balance < points_cost {
        return Err(LedgerError::InsufficientPoints {
            balance: last_balance,
            required: points_cost,
        });
    }
    record_award(
        user_id,
        last_balance,
        Some(product_id),
        -points_cost,
        LedgerKind::Used,
        Some(exchange_id),
        now,
    )
}

/// Sum of deltas, ignoring the stored balances.
pub fn fold_balance(entries: &[LedgerEntry]) -> i64 {
    entries.iter().map(|e| e.points_delta).sum()
}

/// Check that every `balance_after` equals the running sum so far.
pub fn verify(entries: &[LedgerEntry]) -> Result<(), LedgerError> {
    let mut running: i64 = 0;
    for (index, entry) in entries.iter().enumerate() {
        running = running.saturating_add(entry.points_delta);
        if entry.balance_after != running {
            return Err(LedgerError::Inconsistent {
                index,
                expected: running,
                actual: entry.balance_after,
            });
        }
    }
    Ok(())
}

/// In-memory ledger for one user.
#[derive(Debug, Clone)]
pub struct Ledger {
    user_id: Uuid,
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            entries: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn balance(&self) -> i64 {
        self.entries.last().map(|e| e.balance_after).unwrap_or(0)
    }

    pub fn record_award(
        &mut self,
        source_id: Option<Uuid>,
        points_delta: i64,
        kind: LedgerKind,
        cause_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<&LedgerEntry, LedgerError> {
        let entry = record_award(
            self.user_id,
            self.balance(),
            source_id,
            points_delta,
            kind,
            cause_id,
            now,
        )?;
        self.entries.push(entry);
        Ok(&self.entries[self.entries.len() - 1])
    }

    pub fn record_redemption(
        &mut self,
        product_id: Uuid,
        points_cost: i64,
        exchange_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<&LedgerEntry, LedgerError> {
        let entry = record_redemption(
            self.user_id,
            self.balance(),
            product_id,
            points_cost,
            exchange_id,
            now,
        )?;
        self.entries.push(entry);
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// Whether an earned entry already exists for this source and cause.
    pub fn has_award(&self, source_id: Uuid, cause_id: Uuid) -> bool {
        self.entries.iter().any(|e| {
            e.kind == LedgerKind::Earned
                && e.source_id == Some(source_id)
                && e.cause_id == Some(cause_id)
        })
    }
}
