use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use preorder_core::{DomainError, DomainResult, ProductId};

use crate::Product;

/// Basis for a conditional stock update.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpectedStock {
    /// Apply against whatever the current level is (still never below zero).
    Any,
    /// Apply only if the current level equals the observed one.
    Exact(u32),
}

impl ExpectedStock {
    pub fn matches(self, actual: u32) -> bool {
        match self {
            ExpectedStock::Any => true,
            ExpectedStock::Exact(v) => v == actual,
        }
    }
}

/// One conditional stock delta against one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockChange {
    pub product_id: ProductId,
    pub expected: ExpectedStock,
    pub delta: i64,
}

impl StockChange {
    /// Take `quantity` units, conditional on the level observed at validation time.
    pub fn decrement(product_id: ProductId, observed: u32, quantity: u64) -> Self {
        Self {
            product_id,
            expected: ExpectedStock::Exact(observed),
            delta: -(quantity as i64),
        }
    }

    /// Give back `quantity` units unconditionally.
    pub fn restore(product_id: ProductId, quantity: u64) -> Self {
        Self {
            product_id,
            expected: ExpectedStock::Any,
            delta: quantity as i64,
        }
    }

    /// Apply to a product snapshot.
    ///
    /// Fails with `Conflict` when the basis no longer matches, and with
    /// `InvariantViolation` when the result would be negative.
    pub fn apply(&self, product: &Product, at: DateTime<Utc>) -> DomainResult<Product> {
        if product.id != self.product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        if !self.expected.matches(product.stock) {
            return Err(DomainError::conflict(format!(
                "stock of {} changed (expected {:?}, found {})",
                product.id, self.expected, product.stock
            )));
        }

        let mut next = product.clone();
        next.stock = product.stock_after(self.delta)?;
        next.updated_at = at;
        Ok(next)
    }
}
