use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use preorder_core::{DomainError, DomainResult, Entity, MerchantId, ProductId};

/// Product record: a menu item sold by one merchant.
///
/// Price is in the smallest currency unit. Stock never goes negative; the
/// only order-driven mutation is a stock delta applied through the catalog's
/// conditional update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub merchant_id: MerchantId,
    pub name: String,
    pub price: u64,
    pub stock: u32,
    pub available: bool,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(merchant_id: MerchantId, name: impl Into<String>, price: u64, stock: u32) -> Self {
        Self {
            id: ProductId::new(),
            merchant_id,
            name: name.into(),
            price,
            stock,
            available: true,
            updated_at: Utc::now(),
        }
    }

    /// Merchant-initiated price edit. Orders already placed keep their snapshot.
    pub fn with_price(mut self, price: u64) -> Self {
        self.price = price;
        self.updated_at = Utc::now();
        self
    }

    pub fn with_availability(mut self, available: bool) -> Self {
        self.available = available;
        self.updated_at = Utc::now();
        self
    }

    /// Whether `quantity` units can be taken right now.
    pub fn can_be_ordered(&self, quantity: u64) -> bool {
        self.available && u64::from(self.stock) >= quantity
    }

    /// Stock level after applying `delta`, rejecting negative or overflowing results.
    pub fn stock_after(&self, delta: i64) -> DomainResult<u32> {
        let next = i64::from(self.stock) + delta;
        if next < 0 {
            return Err(DomainError::invariant("stock cannot go negative"));
        }
        u32::try_from(next).map_err(|_| DomainError::invariant("stock overflow"))
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
