//! Catalog redemption checks and the exchange-record state machine.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{RedeemError, TransitionError};
use crate::types::{ExchangeRecord, ExchangeStatus, Product, UNLIMITED};

/// What the caller knows about the user when checking a redemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedemptionContext {
    pub balance: i64,
    /// Quantity of this product already pending, approved or completed.
    pub prior_quantity: i64,
}

/// Points needed for `quantity` units of `product`.
pub fn total_cost(product: &Product, quantity: i64) -> i64 {
    product.points_required.saturating_mul(quantity)
}

/// Check whether the user may redeem `quantity` units.
///
/// Checks run in a fixed order and the first failure is returned: quantity,
/// active flag, stock, per-user limit, then balance.
pub fn can_redeem(
    product: &Product,
    quantity: i64,
    context: RedemptionContext,
) -> Result<(), RedeemError> {
    if quantity <= 0 {
        return Err(RedeemError::InvalidQuantity(quantity));
    }
    if !product.is_active {
        return Err(RedeemError::ProductInactive);
    }
    if product.stock_quantity != UNLIMITED && product.stock_quantity < quantity {
        return Err(RedeemError::OutOfStock {
            available: product.stock_quantity.max(0),
            requested: quantity,
        });
    }
    if product.exchange_limit_per_user != UNLIMITED
        && context.prior_quantity + quantity > product.exchange_limit_per_user
    {
        return Err(RedeemError::LimitExceeded {
            limit: product.exchange_limit_per_user,
            already: context.prior_quantity,
            requested: quantity,
        });
    }
    let required = total_cost(product, quantity);
    if context.balance < required {
        return Err(RedeemError::InsufficientPoints {
            balance: context.balance,
            required,
        });
    }
    Ok(())
}

/// Exchange record for an admissible request, in its initial status.
pub fn new_exchange(
    user_id: Uuid,
    product: &Product,
    quantity: i64,
    now: DateTime<Utc>,
) -> ExchangeRecord {
    ExchangeRecord {
        id: Uuid::new_v4(),
        user_id,
        product_id: product.id,
        quantity,
        points_spent: total_cost(product, quantity),
        status: ExchangeStatus::initial(product.requires_approval),
        note: None,
        created_at: now,
        updated_at: now,
    }
}

impl ExchangeStatus {
    /// Status a new request starts in.
    pub fn initial(requires_approval: bool) -> Self {
        if requires_approval {
            Self::Pending
        } else {
            Self::Completed
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Rejected)
    }

    /// Whether records in this status use up the per-user limit.
    pub fn counts_toward_limit(&self) -> bool {
        !matches!(self, Self::Rejected)
    }

    /// Status names that use up the per-user limit, for storage queries.
    pub fn limit_statuses() -> Vec<&'static str> {
        Self::ALL
            .iter()
            .filter(|s| s.counts_toward_limit())
            .map(|s| s.as_str())
            .collect()
    }

    /// Validate a move to `to`.
    ///
    /// `pending -> approved -> completed` and `pending -> rejected`.
    pub fn transition(self, to: ExchangeStatus) -> Result<ExchangeStatus, TransitionError> {
        match (self, to) {
            (Self::Pending, Self::Approved)
            | (Self::Pending, Self::Rejected)
            | (Self::Approved, Self::Completed) => Ok(to),
            _ => Err(TransitionError {
                from: self.as_str(),
                to: to.as_str(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn product(points: i64, stock: i64, limit: i64) -> Product {
        Product {
            id: Uuid::new_v4(),
            category_id: None,
            name: "Sticker pack".to_string(),
            description: String::new(),
            points_required: points,
            stock_quantity: stock,
            exchange_limit_per_user: limit,
            requires_approval: false,
            is_active: true,
            sort_order: 0,
        }
    }

    fn context(balance: i64, prior_quantity: i64) -> RedemptionContext {
        RedemptionContext {
            balance,
            prior_quantity,
        }
    }

    #[test]
    fn admissible_request_passes() {
        assert_eq!(can_redeem(&product(50, 10, 5), 2, context(100, 0)), Ok(()));
    }

    #[test]
    fn insufficient_points_for_quantity() {
        assert_eq!(
            can_redeem(&product(50, UNLIMITED, UNLIMITED), 3, context(120, 0)),
            Err(RedeemError::InsufficientPoints {
                balance: 120,
                required: 150
            })
        );
    }

    #[test]
    fn zero_stock_is_out_of_stock() {
        let err = can_redeem(&product(1, 0, UNLIMITED), 1, context(100, 0)).unwrap_err();
        assert_eq!(err.reason(), "out_of_stock");
    }

    #[test]
    fn limit_counts_prior_quantity() {
        let err = can_redeem(&product(1, UNLIMITED, 3), 2, context(100, 2)).unwrap_err();
        assert_eq!(
            err,
            RedeemError::LimitExceeded {
                limit: 3,
                already: 2,
                requested: 2
            }
        );
        assert!(can_redeem(&product(1, UNLIMITED, 3), 1, context(100, 2)).is_ok());
    }

    #[test]
    fn first_failing_check_wins() {
        let mut p = product(500, 0, 1);
        p.is_active = false;
        assert_eq!(
            can_redeem(&p, 2, context(0, 1)),
            Err(RedeemError::ProductInactive)
        );
        p.is_active = true;
        assert_eq!(can_redeem(&p, 2, context(0, 1)).unwrap_err().reason(), "out_of_stock");
    }

    #[test]
    fn non_positive_quantity_rejected() {
        assert_eq!(
            can_redeem(&product(1, UNLIMITED, UNLIMITED), 0, context(10, 0)),
            Err(RedeemError::InvalidQuantity(0))
        );
    }

    #[test]
    fn initial_status_depends_on_approval() {
        let mut p = product(10, UNLIMITED, UNLIMITED);
        assert_eq!(new_exchange(Uuid::new_v4(), &p, 2, Utc::now()).status, ExchangeStatus::Completed);
        p.requires_approval = true;
        let record = new_exchange(Uuid::new_v4(), &p, 2, Utc::now());
        assert_eq!(record.status, ExchangeStatus::Pending);
        assert_eq!(record.points_spent, 20);
    }

    #[test]
    fn rejected_exchanges_do_not_use_the_limit() {
        assert_eq!(
            ExchangeStatus::limit_statuses(),
            vec!["pending", "approved", "completed"]
        );
    }

    #[test]
    fn state_machine_transitions() {
        use ExchangeStatus::*;
        assert_eq!(Pending.transition(Approved), Ok(Approved));
        assert_eq!(Approved.transition(Completed), Ok(Completed));
        assert_eq!(Pending.transition(Rejected), Ok(Rejected));
        assert!(Pending.transition(Completed).is_err());
        assert!(Approved.transition(Rejected).is_err());
        assert!(Completed.transition(Pending).is_err());
        assert!(Rejected.transition(Approved).is_err());
        assert!(Rejected.is_terminal() && Completed.is_terminal());
    }
}
