//! Storage boundaries the order service runs against.
//!
//! Each boundary is a trait with a lock-guarded in-memory implementation for
//! tests and dev. A transactional backend only has to honour the same
//! conditional-update contracts.

pub mod catalog;
pub mod ledger;
pub mod registry;

pub use catalog::{Catalog, InMemoryCatalog};
pub use ledger::{InMemoryOrderLedger, LedgerScope, OrderLedger, OrderQuery};
pub use registry::{InMemoryMerchantRegistry, MerchantRegistry};

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A conditional update lost against a concurrent writer.
    #[error("conditional update failed: {0}")]
    Conflict(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("record already exists: {0}")]
    Duplicate(String),

    /// Backend failure (lock poisoning, IO, timeout).
    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub(crate) fn poisoned() -> Self {
        StoreError::Backend("lock poisoned".to_string())
    }
}
