use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use preorder_core::{AggregateRoot, ExpectedVersion, MerchantId, OrderId, UserId};
use preorder_orders::{Order, OrderStatus};

use super::StoreError;

/// Whose orders a listing covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerScope {
    Buyer(UserId),
    Merchants(Vec<MerchantId>),
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderQuery {
    pub scope: LedgerScope,
    pub status: Option<OrderStatus>,
}

impl OrderQuery {
    pub fn new(scope: LedgerScope) -> Self {
        Self {
            scope,
            status: None,
        }
    }

    pub fn with_status(mut self, status: Option<OrderStatus>) -> Self {
        self.status = status;
        self
    }

    pub fn matches(&self, order: &Order) -> bool {
        let in_scope = match &self.scope {
            LedgerScope::Buyer(buyer_id) => order.buyer_id() == *buyer_id,
            LedgerScope::Merchants(ids) => ids.contains(&order.merchant_id()),
            LedgerScope::All => true,
        };
        in_scope && self.status.is_none_or(|s| order.status() == s)
    }
}

/// Authoritative store of orders.
///
/// Updates are conditional on the stored order's version, so two writers
/// that loaded the same version cannot both commit.
pub trait OrderLedger: Send + Sync {
    /// Persist a new order. Fails with `Duplicate` if the id is taken.
    fn insert(&self, order: Order) -> Result<(), StoreError>;

    fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Orders matching `query`, newest first.
    fn list(&self, query: &OrderQuery) -> Result<Vec<Order>, StoreError>;

    /// Replace the stored order if its version matches `expected`.
    fn update(&self, order: Order, expected: ExpectedVersion) -> Result<(), StoreError>;
}

impl<S> OrderLedger for Arc<S>
where
    S: OrderLedger + ?Sized,
{
    fn insert(&self, order: Order) -> Result<(), StoreError> {
        (**self).insert(order)
    }

    fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        (**self).get(id)
    }

    fn list(&self, query: &OrderQuery) -> Result<Vec<Order>, StoreError> {
        (**self).list(query)
    }

    fn update(&self, order: Order, expected: ExpectedVersion) -> Result<(), StoreError> {
        (**self).update(order, expected)
    }
}

/// In-memory ledger for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryOrderLedger {
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl InMemoryOrderLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderLedger for InMemoryOrderLedger {
    fn insert(&self, order: Order) -> Result<(), StoreError> {
        let mut orders = self.orders.write().map_err(|_| StoreError::poisoned())?;
        let id = order.id_typed();
        if orders.contains_key(&id) {
            return Err(StoreError::Duplicate(format!("order {id}")));
        }
        orders.insert(id, order);
        Ok(())
    }

    fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let orders = self.orders.read().map_err(|_| StoreError::poisoned())?;
        Ok(orders.get(&id).cloned())
    }

    fn list(&self, query: &OrderQuery) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.read().map_err(|_| StoreError::poisoned())?;
        let mut matching: Vec<Order> = orders
            .values()
            .filter(|o| query.matches(o))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id_typed().cmp(&a.id_typed()))
        });
        Ok(matching)
    }

    fn update(&self, order: Order, expected: ExpectedVersion) -> Result<(), StoreError> {
        let mut orders = self.orders.write().map_err(|_| StoreError::poisoned())?;
        let id = order.id_typed();
        let current = orders
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(format!("order {id}")))?;

        expected
            .check(current.version())
            .map_err(|e| StoreError::Conflict(format!("order {id}: {e}")))?;

        orders.insert(id, order);
        Ok(())
    }
}
