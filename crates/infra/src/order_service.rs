//! Order service: the transactional boundary around the lifecycle engine.
//!
//! ```text
//! request
//!   ↓
//! 1. Authorize the principal (role permission, order access)
//!   ↓
//! 2. Load merchant / product / order snapshots
//!   ↓
//! 3. Decide (pure lifecycle engine)
//!   ↓
//! 4. Apply: conditional stock update + conditional ledger write,
//!    committed as one unit
//! ```
//!
//! Lost conditional writes are retried from fresh snapshots with jittered
//! backoff, up to the configured bound, before surfacing as `Conflict`.
//! Engine failures are never retried.

use std::collections::HashMap;
use std::thread;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use preorder_auth::{
    ListScope, OrderAccess, OrderParties, Permission, Principal, authorize, list_scope,
    order_access,
};
use preorder_catalog::Product;
use preorder_core::{Aggregate, AggregateRoot, DomainError, ExpectedVersion, OrderId};
use preorder_orders::{
    Order, OrderCommand, OrderStatus, PlacementRequest, ReschedulePickup, TransitionOrder,
    lifecycle,
};

use crate::config::ServiceConfig;
use crate::store::{Catalog, LedgerScope, MerchantRegistry, OrderLedger, OrderQuery, StoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Deterministic engine or authorization outcome.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Concurrent writers kept winning until retries ran out.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(StoreError),
}

impl ServiceError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Conflict(_))
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            StoreError::NotFound(_) => ServiceError::Domain(DomainError::NotFound),
            other => ServiceError::Storage(other),
        }
    }
}

/// Runs order operations against a catalog, a merchant registry and a ledger.
#[derive(Debug)]
pub struct OrderService<C, R, L> {
    catalog: C,
    merchants: R,
    ledger: L,
    config: ServiceConfig,
}

impl<C, R, L> OrderService<C, R, L> {
    pub fn new(catalog: C, merchants: R, ledger: L) -> Self {
        Self::with_config(catalog, merchants, ledger, ServiceConfig::default())
    }

    pub fn with_config(catalog: C, merchants: R, ledger: L, config: ServiceConfig) -> Self {
        Self {
            catalog,
            merchants,
            ledger,
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn merchants(&self) -> &R {
        &self.merchants
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn into_parts(self) -> (C, R, L) {
        (self.catalog, self.merchants, self.ledger)
    }
}

impl<C, R, L> OrderService<C, R, L>
where
    C: Catalog,
    R: MerchantRegistry,
    L: OrderLedger,
{
    /// Place an order for the principal.
    ///
    /// Stock for every line is taken in one conditional update against the
    /// levels the request was validated on, committed together with the
    /// ledger insert. Either both land or neither is observable.
    #[instrument(
        skip(self, principal, request),
        fields(buyer_id = %principal.user_id, merchant_id = %request.merchant_id)
    )]
    pub fn create_order(
        &self,
        principal: &Principal,
        request: PlacementRequest,
    ) -> Result<Order, ServiceError> {
        authorize(principal, &Permission::PLACE_ORDER).map_err(DomainError::from)?;
        if request.buyer_id != principal.user_id {
            return Err(DomainError::Unauthorized.into());
        }
        lifecycle::validate_notes(request.notes.as_deref(), self.config.max_notes_len)?;

        let order = self.with_retry("create_order", || self.try_create(&request, Utc::now()))?;
        info!(
            order_id = %order.id_typed(),
            total = order.total(),
            lines = order.lines().len(),
            "order placed"
        );
        Ok(order)
    }

    /// Move an order to `target` on behalf of the principal.
    ///
    /// Cancelling needs `orders.cancel` and restores the stock taken at
    /// placement; every other move needs `orders.fulfil`.
    #[instrument(
        skip(self, principal, reason),
        fields(user_id = %principal.user_id, role = %principal.role)
    )]
    pub fn transition_order(
        &self,
        order_id: OrderId,
        target: OrderStatus,
        principal: &Principal,
        reason: Option<String>,
    ) -> Result<Order, ServiceError> {
        self.with_retry("transition_order", || {
            self.try_transition(order_id, target, principal, reason.clone(), Utc::now())
        })
    }

    /// Change the requested pickup time of an order that has not started.
    #[instrument(skip(self, principal), fields(user_id = %principal.user_id))]
    pub fn reschedule_pickup(
        &self,
        order_id: OrderId,
        pickup_time: DateTime<Utc>,
        principal: &Principal,
    ) -> Result<Order, ServiceError> {
        self.with_retry("reschedule_pickup", || {
            let now = Utc::now();
            let order = self.load_order(order_id)?;
            let access = self.access(principal, &order)?;

            let (next, _) = order.execute(&OrderCommand::ReschedulePickup(ReschedulePickup {
                order_id,
                pickup_time,
                side: access.side(),
                occurred_at: now,
            }))?;
            self.ledger
                .update(next.clone(), ExpectedVersion::Exact(order.version()))?;

            info!(order_id = %order_id, pickup_time = %pickup_time, "pickup rescheduled");
            Ok(next)
        })
    }

    /// Point lookup. Principals unrelated to the order get `NotFound`.
    #[instrument(skip(self, principal), fields(user_id = %principal.user_id))]
    pub fn get_order(
        &self,
        order_id: OrderId,
        principal: &Principal,
    ) -> Result<Order, ServiceError> {
        let order = self.load_order(order_id)?;
        self.access(principal, &order)?;
        Ok(order)
    }

    /// Orders visible to the principal: placed by a buyer, received by a
    /// seller's merchants, or everything for a role holding `orders.read_all`.
    #[instrument(
        skip(self, principal),
        fields(user_id = %principal.user_id, role = %principal.role)
    )]
    pub fn list_orders(
        &self,
        principal: &Principal,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, ServiceError> {
        let scope = match list_scope(principal) {
            ListScope::PlacedBy(buyer_id) => LedgerScope::Buyer(buyer_id),
            ListScope::OwnedMerchants(owner_id) => {
                LedgerScope::Merchants(self.merchants.owned_by(owner_id)?)
            }
            ListScope::All => LedgerScope::All,
        };

        let orders = self.ledger.list(&OrderQuery::new(scope).with_status(status))?;
        debug!(count = orders.len(), "orders listed");
        Ok(orders)
    }

    fn try_create(
        &self,
        request: &PlacementRequest,
        now: DateTime<Utc>,
    ) -> Result<Order, ServiceError> {
        let merchant = self
            .merchants
            .get_merchant(request.merchant_id)?
            .ok_or(DomainError::NotFound)?;

        let mut products = HashMap::new();
        for product_id in request.product_ids() {
            let product: Product = self
                .catalog
                .get_product(product_id)?
                .ok_or(DomainError::NotFound)?;
            products.insert(product_id, product);
        }

        let priced = lifecycle::validate_and_price(request, &merchant, &products, now)?;

        let order_id = OrderId::new();
        let placed = lifecycle::place(order_id, request, &priced, now);
        let order = Order::from_events(order_id, [&placed]);

        let mut insert = || self.ledger.insert(order.clone());
        self.catalog
            .apply_stock_with(&priced.decrements, now, &mut insert)?;

        Ok(order)
    }

    fn try_transition(
        &self,
        order_id: OrderId,
        target: OrderStatus,
        principal: &Principal,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Order, ServiceError> {
        let order = self.load_order(order_id)?;
        let access = self.access(principal, &order)?;

        let (next, _) = order.execute(&OrderCommand::Transition(TransitionOrder {
            order_id,
            target,
            side: access.side(),
            reason,
            occurred_at: now,
        }))?;
        authorize(principal, &target.required_permission()).map_err(DomainError::from)?;

        let restock = if target == OrderStatus::Cancelled {
            lifecycle::restock_for(&order)
        } else {
            Vec::new()
        };

        let mut commit = || {
            self.ledger.update(next.clone(), ExpectedVersion::Exact(order.version()))
        };
        if restock.is_empty() {
            commit()?;
        } else {
            self.catalog.apply_stock_with(&restock, now, &mut commit)?;
        }

        info!(
            order_id = %order_id,
            from = %order.status(),
            to = %next.status(),
            restocked = restock.len(),
            "order status changed"
        );
        Ok(next)
    }

    fn load_order(&self, order_id: OrderId) -> Result<Order, ServiceError> {
        Ok(self.ledger.get(order_id)?.ok_or(DomainError::NotFound)?)
    }

    fn access(&self, principal: &Principal, order: &Order) -> Result<OrderAccess, ServiceError> {
        let merchant_owner = self
            .merchants
            .get_merchant(order.merchant_id())?
            .map(|m| m.owner_id);
        let parties = OrderParties {
            buyer_id: order.buyer_id(),
            merchant_owner,
        };
        Ok(order_access(principal, &parties)?)
    }

    fn with_retry<T>(
        &self,
        operation: &'static str,
        mut attempt: impl FnMut() -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let policy = &self.config.retry;
        let mut retries = 0;
        loop {
            match attempt() {
                Err(e) if e.is_retryable() && policy.should_retry(retries) => {
                    retries += 1;
                    let delay = policy.delay_for_attempt(retries);
                    debug!(
                        operation,
                        retry = retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "conflict; retrying"
                    );
                    thread::sleep(delay);
                }
                Err(e) if e.is_retryable() => {
                    warn!(operation, retries, error = %e, "giving up after repeated conflicts");
                    return Err(e);
                }
                other => return other,
            }
        }
    }
}
