//! Lifecycle engine: pure decisions for placing and moving orders.
//!
//! Callers hand in snapshots (merchant, products, the current order) plus the
//! evaluation instant; the engine answers with a decision or a typed error.
//! Applying a decision to storage is the caller's job.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use preorder_auth::Side;
use preorder_catalog::{Merchant, Product, StockChange};
use preorder_core::{DomainError, DomainResult, MerchantId, OrderId, ProductId, UserId};

use crate::order::{
    Order, OrderEvent, OrderLine, OrderPlaced, OrderStatusChanged, PickupRescheduled,
};
use crate::status::{Edge, OrderStatus};

/// One requested line as it arrives from the caller (quantity unchecked).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl RequestedLine {
    pub fn new(product_id: ProductId, quantity: i64) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// A buyer's request to place an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRequest {
    pub buyer_id: UserId,
    pub merchant_id: MerchantId,
    pub lines: Vec<RequestedLine>,
    pub notes: Option<String>,
    pub pickup_time: Option<DateTime<Utc>>,
}

impl PlacementRequest {
    pub fn new(buyer_id: UserId, merchant_id: MerchantId, lines: Vec<RequestedLine>) -> Self {
        Self {
            buyer_id,
            merchant_id,
            lines,
            notes: None,
            pickup_time: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_pickup_time(mut self, pickup_time: DateTime<Utc>) -> Self {
        self.pickup_time = Some(pickup_time);
        self
    }

    /// Distinct product ids referenced by the request, in first-seen order.
    pub fn product_ids(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = Vec::with_capacity(self.lines.len());
        for line in &self.lines {
            if !ids.contains(&line.product_id) {
                ids.push(line.product_id);
            }
        }
        ids
    }
}

/// Outcome of a successful validate-and-price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedOrder {
    pub lines: Vec<OrderLine>,
    pub total: u64,
    /// One conditional decrement per distinct product.
    pub decrements: Vec<StockChange>,
}

/// Validate a placement request against merchant and product snapshots and
/// price it at the products' current prices.
///
/// Duplicate product ids stay separate lines but are checked against stock
/// cumulatively and produce a single decrement.
pub fn validate_and_price(
    request: &PlacementRequest,
    merchant: &Merchant,
    products: &HashMap<ProductId, Product>,
    now: DateTime<Utc>,
) -> DomainResult<PricedOrder> {
    if merchant.id != request.merchant_id {
        return Err(DomainError::invariant("merchant_id mismatch"));
    }
    if !merchant.can_accept_orders() {
        return Err(DomainError::MerchantUnavailable {
            merchant_id: merchant.id,
        });
    }
    if request.lines.is_empty() {
        return Err(DomainError::EmptyOrder);
    }

    let mut lines = Vec::with_capacity(request.lines.len());
    let mut total: u64 = 0;
    // (product, cumulative quantity, stock observed)
    let mut demand: Vec<(ProductId, u64, u32)> = Vec::new();

    for requested in &request.lines {
        let product_id = requested.product_id;
        let quantity = u32::try_from(requested.quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or(DomainError::InvalidQuantity {
                product_id,
                quantity: requested.quantity,
            })?;

        let product = products
            .get(&product_id)
            .ok_or(DomainError::ProductNotFound(product_id))?;

        if product.merchant_id != merchant.id {
            return Err(DomainError::CrossMerchantOrder {
                product_id,
                merchant_id: merchant.id,
            });
        }
        if !product.available {
            return Err(DomainError::ProductUnavailable(product_id));
        }

        let cumulative = match demand.iter_mut().find(|(id, _, _)| *id == product_id) {
            Some(entry) => {
                entry.1 += u64::from(quantity);
                entry.1
            }
            None => {
                demand.push((product_id, u64::from(quantity), product.stock));
                u64::from(quantity)
            }
        };
        if !product.can_be_ordered(cumulative) {
            return Err(DomainError::InsufficientStock {
                product_id,
                requested: cumulative,
                available: product.stock,
            });
        }

        let subtotal = product
            .price
            .checked_mul(u64::from(quantity))
            .ok_or_else(|| DomainError::validation("line subtotal overflows"))?;
        total = total
            .checked_add(subtotal)
            .ok_or_else(|| DomainError::validation("order total overflows"))?;

        lines.push(OrderLine {
            product_id,
            product_name: product.name.clone(),
            quantity,
            unit_price: product.price,
        });
    }

    if let Some(pickup_time) = request.pickup_time {
        if pickup_time <= now {
            return Err(DomainError::InvalidPickupTime);
        }
    }

    let decrements = demand
        .into_iter()
        .map(|(product_id, quantity, observed)| {
            StockChange::decrement(product_id, observed, quantity)
        })
        .collect();

    Ok(PricedOrder {
        lines,
        total,
        decrements,
    })
}

/// Reject notes longer than `max_len` characters.
pub fn validate_notes(notes: Option<&str>, max_len: usize) -> DomainResult<()> {
    match notes {
        Some(n) if n.chars().count() > max_len => Err(DomainError::validation(format!(
            "notes exceed {max_len} characters"
        ))),
        _ => Ok(()),
    }
}

/// Build the placement event for a priced order. The order is born `placed`.
pub fn place(
    order_id: OrderId,
    request: &PlacementRequest,
    priced: &PricedOrder,
    now: DateTime<Utc>,
) -> OrderEvent {
    OrderEvent::OrderPlaced(OrderPlaced {
        order_id,
        buyer_id: request.buyer_id,
        merchant_id: request.merchant_id,
        lines: priced.lines.clone(),
        total: priced.total,
        notes: request.notes.clone(),
        pickup_time: request.pickup_time,
        occurred_at: now,
    })
}

/// Outcome of a successful transition decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionDecision {
    pub from: OrderStatus,
    pub to: OrderStatus,
    /// Stock restorations to apply (non-empty only for cancellations).
    pub restock: Vec<StockChange>,
    pub event: OrderEvent,
}

/// Decide whether `side` may move `order` to `target`.
///
/// The table is checked before the actor, so an illegal edge is reported as
/// `InvalidTransition` whoever asks.
pub fn transition(
    order: &Order,
    target: OrderStatus,
    side: Option<Side>,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> DomainResult<TransitionDecision> {
    let from = order.status();
    let edge = Edge::lookup(from, target)
        .ok_or_else(|| DomainError::invalid_transition(from, target))?;

    let side = match side {
        Some(side) if edge.initiator.permits(side) => side,
        _ => return Err(DomainError::Unauthorized),
    };

    let cancelling = target == OrderStatus::Cancelled;
    let restock = if cancelling {
        restock_for(order)
    } else {
        Vec::new()
    };

    Ok(TransitionDecision {
        from,
        to: target,
        restock,
        event: OrderEvent::StatusChanged(OrderStatusChanged {
            order_id: order.id_typed(),
            from,
            to: target,
            side,
            reason: reason.filter(|_| cancelling),
            occurred_at: now,
        }),
    })
}

/// Restorations mirroring the decrements taken when `order` was placed.
pub fn restock_for(order: &Order) -> Vec<StockChange> {
    let mut per_product: Vec<(ProductId, u64)> = Vec::new();
    for line in order.lines() {
        match per_product.iter_mut().find(|(id, _)| *id == line.product_id) {
            Some(entry) => entry.1 += u64::from(line.quantity),
            None => per_product.push((line.product_id, u64::from(line.quantity))),
        }
    }
    per_product
        .into_iter()
        .map(|(product_id, quantity)| StockChange::restore(product_id, quantity))
        .collect()
}

/// Decide a pickup-time change. Allowed for either side while the order is
/// still `placed` or `confirmed`.
pub fn reschedule_pickup(
    order: &Order,
    pickup_time: DateTime<Utc>,
    side: Option<Side>,
    now: DateTime<Utc>,
) -> DomainResult<OrderEvent> {
    if side.is_none() {
        return Err(DomainError::Unauthorized);
    }
    if !matches!(order.status(), OrderStatus::Placed | OrderStatus::Confirmed) {
        return Err(DomainError::invariant(format!(
            "cannot change pickup time of a {} order",
            order.status()
        )));
    }
    if pickup_time <= now {
        return Err(DomainError::InvalidPickupTime);
    }

    Ok(OrderEvent::PickupRescheduled(PickupRescheduled {
        order_id: order.id_typed(),
        pickup_time,
        occurred_at: now,
    }))
}
