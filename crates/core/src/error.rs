//! Domain error model.

use thiserror::Error;

use crate::id::{MerchantId, ProductId};

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every variant is a deterministic outcome of evaluating a request against a
/// snapshot of state. None of them are retried automatically; storage and
/// contention failures belong to the infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A referenced record is absent, or the actor has no relation to it.
    #[error("not found")]
    NotFound,

    /// The actor is related to the target but on the wrong side.
    #[error("unauthorized")]
    Unauthorized,

    /// The target merchant is not accepting orders.
    #[error("merchant {merchant_id} is not accepting orders")]
    MerchantUnavailable { merchant_id: MerchantId },

    /// An order was requested without any lines.
    #[error("order must contain at least one line")]
    EmptyOrder,

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("product {0} is not available")]
    ProductUnavailable(ProductId),

    /// Requested quantity (cumulative over the order) exceeds the stock on hand.
    #[error("insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u64,
        available: u32,
    },

    #[error("invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: ProductId, quantity: i64 },

    /// A line references a product owned by a different merchant.
    #[error("product {product_id} does not belong to merchant {merchant_id}")]
    CrossMerchantOrder {
        product_id: ProductId,
        merchant_id: MerchantId,
    },

    #[error("pickup time must be in the future")]
    InvalidPickupTime,

    /// The (from, to) pair is not an edge of the order state machine.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A conflict occurred (e.g. stale version / optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn invalid_transition(from: impl ToString, to: impl ToString) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}
