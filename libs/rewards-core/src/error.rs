//! Error types for rewards-core.

use thiserror::Error;

/// Errors raised while parsing a trigger condition config.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("condition config must be a JSON object")]
    NotAnObject,

    #[error("condition config has no \"type\" field")]
    MissingKind,

    #[error("unknown condition kind: {0}")]
    UnknownKind(String),

    #[error("malformed {kind} condition: {message}")]
    Malformed { kind: String, message: String },

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: i64 },

    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: i64 },

    #[error("{field} must be between 0 and 100, got {value}")]
    OutOfRange { field: &'static str, value: i64 },
}

/// Errors raised when appending to the award ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("insufficient points: balance {balance}, required {required}")]
    InsufficientPoints { balance: i64, required: i64 },

    #[error("invalid delta {delta} for {kind} entry")]
    InvalidDelta { kind: &'static str, delta: i64 },

    #[error("balance {balance} cannot absorb delta {delta}")]
    Overflow { balance: i64, delta: i64 },

    #[error("ledger entry {index} has balance_after {actual}, expected {expected}")]
    Inconsistent {
        index: usize,
        expected: i64,
        actual: i64,
    },
}

/// Reasons a redemption request is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RedeemError {
    #[error("quantity must be positive, got {0}")]
    InvalidQuantity(i64),

    #[error("product is not active")]
    ProductInactive,

    #[error("out of stock: {available} available, {requested} requested")]
    OutOfStock { available: i64, requested: i64 },

    #[error("exchange limit exceeded: limit {limit}, already exchanged {already}, requested {requested}")]
    LimitExceeded {
        limit: i64,
        already: i64,
        requested: i64,
    },

    #[error("insufficient points: balance {balance}, required {required}")]
    InsufficientPoints { balance: i64, required: i64 },
}

impl RedeemError {
    /// Stable machine-readable reason code.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidQuantity(_) => "invalid_quantity",
            Self::ProductInactive => "product_inactive",
            Self::OutOfStock { .. } => "out_of_stock",
            Self::LimitExceeded { .. } => "limit_exceeded",
            Self::InsufficientPoints { .. } => "insufficient_points",
        }
    }
}

/// Illegal exchange-record status change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot move exchange from {from} to {to}")]
pub struct TransitionError {
    pub from: &'static str,
    pub to: &'static str,
}
