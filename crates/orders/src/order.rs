use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use preorder_auth::Side;
use preorder_core::{
    Aggregate, AggregateRoot, DomainError, Event, MerchantId, OrderId, ProductId, UserId,
    ValueObject,
};

use crate::lifecycle;
use crate::status::OrderStatus;

/// Order line: product, quantity and the price/name captured at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    /// Price in smallest currency unit, as it was when the order was placed.
    pub unit_price: u64,
}

impl OrderLine {
    pub fn subtotal(&self) -> u64 {
        self.unit_price.saturating_mul(u64::from(self.quantity))
    }
}

impl ValueObject for OrderLine {}

/// One entry of an order's append-only status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub side: Side,
    pub at: DateTime<Utc>,
}

/// Aggregate root: Order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    buyer_id: UserId,
    merchant_id: MerchantId,
    lines: Vec<OrderLine>,
    total: u64,
    status: OrderStatus,
    notes: Option<String>,
    pickup_time: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    cancelled_at: Option<DateTime<Utc>>,
    cancellation_reason: Option<String>,
    history: Vec<StatusChange>,
    version: u64,
    created: bool,
}

impl Order {
    /// Create an empty, not-yet-placed aggregate instance for rehydration.
    pub fn empty(id: OrderId) -> Self {
        Self {
            id,
            buyer_id: UserId::from_uuid(Default::default()),
            merchant_id: MerchantId::from_uuid(Default::default()),
            lines: Vec::new(),
            total: 0,
            status: OrderStatus::Placed,
            notes: None,
            pickup_time: None,
            created_at: DateTime::<Utc>::MIN_UTC,
            updated_at: DateTime::<Utc>::MIN_UTC,
            cancelled_at: None,
            cancellation_reason: None,
            history: Vec::new(),
            version: 0,
            created: false,
        }
    }

    /// Rebuild an order from its events, in order.
    pub fn from_events<'a>(id: OrderId, events: impl IntoIterator<Item = &'a OrderEvent>) -> Self {
        let mut order = Self::empty(id);
        for event in events {
            order.apply(event);
        }
        order
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn buyer_id(&self) -> UserId {
        self.buyer_id
    }

    pub fn merchant_id(&self) -> MerchantId {
        self.merchant_id
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn pickup_time(&self) -> Option<DateTime<Utc>> {
        self.pickup_time
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    pub fn history(&self) -> &[StatusChange] {
        &self.history
    }

    pub fn is_placed(&self) -> bool {
        self.created
    }

    /// Whether the order is a pre-order: its pickup time lies after `now`.
    pub fn is_preorder(&self, now: DateTime<Utc>) -> bool {
        self.pickup_time.is_some_and(|t| t > now)
    }

    /// Quantity ordered for a product across all lines.
    pub fn quantity_of(&self, product_id: ProductId) -> u64 {
        self.lines
            .iter()
            .filter(|l| l.product_id == product_id)
            .map(|l| u64::from(l.quantity))
            .sum()
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: move an order along the state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOrder {
    pub order_id: OrderId,
    pub target: OrderStatus,
    /// Side the actor acts on, `None` when the actor holds no side.
    pub side: Option<Side>,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: change the requested pickup time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReschedulePickup {
    pub order_id: OrderId,
    pub pickup_time: DateTime<Utc>,
    pub side: Option<Side>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
    Transition(TransitionOrder),
    ReschedulePickup(ReschedulePickup),
}

/// Event: OrderPlaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: OrderId,
    pub buyer_id: UserId,
    pub merchant_id: MerchantId,
    pub lines: Vec<OrderLine>,
    pub total: u64,
    pub notes: Option<String>,
    pub pickup_time: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderStatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChanged {
    pub order_id: OrderId,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub side: Side,
    /// Only set for cancellations.
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PickupRescheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickupRescheduled {
    pub order_id: OrderId,
    pub pickup_time: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    OrderPlaced(OrderPlaced),
    StatusChanged(OrderStatusChanged),
    PickupRescheduled(PickupRescheduled),
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "orders.order.placed",
            OrderEvent::StatusChanged(_) => "orders.order.status_changed",
            OrderEvent::PickupRescheduled(_) => "orders.order.pickup_rescheduled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderPlaced(e) => e.occurred_at,
            OrderEvent::StatusChanged(e) => e.occurred_at,
            OrderEvent::PickupRescheduled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Order {
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::OrderPlaced(e) => {
                self.id = e.order_id;
                self.buyer_id = e.buyer_id;
                self.merchant_id = e.merchant_id;
                self.lines = e.lines.clone();
                self.total = e.total;
                self.status = OrderStatus::Placed;
                self.notes = e.notes.clone();
                self.pickup_time = e.pickup_time;
                self.created_at = e.occurred_at;
                self.updated_at = e.occurred_at;
                self.created = true;
            }
            OrderEvent::StatusChanged(e) => {
                self.status = e.to;
                self.updated_at = e.occurred_at;
                if e.to == OrderStatus::Cancelled {
                    self.cancelled_at = Some(e.occurred_at);
                    self.cancellation_reason = e.reason.clone();
                }
                self.history.push(StatusChange {
                    from: e.from,
                    to: e.to,
                    side: e.side,
                    at: e.occurred_at,
                });
            }
            OrderEvent::PickupRescheduled(e) => {
                self.pickup_time = Some(e.pickup_time);
                self.updated_at = e.occurred_at;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        if !self.created {
            return Err(DomainError::not_found());
        }

        match command {
            OrderCommand::Transition(cmd) => {
                self.ensure_order_id(cmd.order_id)?;
                let decision = lifecycle::transition(
                    self,
                    cmd.target,
                    cmd.side,
                    cmd.reason.clone(),
                    cmd.occurred_at,
                )?;
                Ok(vec![decision.event])
            }
            OrderCommand::ReschedulePickup(cmd) => {
                self.ensure_order_id(cmd.order_id)?;
                let event =
                    lifecycle::reschedule_pickup(self, cmd.pickup_time, cmd.side, cmd.occurred_at)?;
                Ok(vec![event])
            }
        }
    }
}

impl Order {
    fn ensure_order_id(&self, order_id: OrderId) -> Result<(), DomainError> {
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::test_support::{Fixture, order_in_status};

    fn transition_cmd(
        order: &Order,
        target: OrderStatus,
        side: Side,
        at: DateTime<Utc>,
    ) -> OrderCommand {
        OrderCommand::Transition(TransitionOrder {
            order_id: order.id_typed(),
            target,
            side: Some(side),
            reason: None,
            occurred_at: at,
        })
    }

    #[test]
    fn placed_order_snapshots_lines_and_total() {
        let fx = Fixture::new();
        let order = order_in_status(&fx, OrderStatus::Placed);

        assert!(order.is_placed());
        assert_eq!(order.status(), OrderStatus::Placed);
        assert_eq!(order.buyer_id(), fx.buyer);
        assert_eq!(order.merchant_id(), fx.merchant.id);
        assert_eq!(order.total(), 2 * 15_000 + 4_000);
        assert_eq!(
            order.total(),
            order.lines().iter().map(OrderLine::subtotal).sum::<u64>()
        );
        assert_eq!(order.created_at(), fx.now);
        assert_eq!(order.version(), 1);
        assert!(order.history().is_empty());
    }

    #[test]
    fn handle_on_unplaced_order_is_not_found() {
        let order = Order::empty(OrderId::new());
        let cmd = transition_cmd(&order, OrderStatus::Confirmed, Side::Merchant, Utc::now());
        assert_eq!(order.handle(&cmd).unwrap_err(), DomainError::NotFound);
    }

    #[test]
    fn handle_rejects_commands_for_other_orders() {
        let fx = Fixture::new();
        let order = order_in_status(&fx, OrderStatus::Placed);
        let other = Order::empty(OrderId::new());
        let cmd = transition_cmd(&other, OrderStatus::Confirmed, Side::Merchant, fx.now);
        assert!(matches!(
            order.handle(&cmd),
            Err(DomainError::InvariantViolation(_))
        ));
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let fx = Fixture::new();
        let order = order_in_status(&fx, OrderStatus::Placed);
        let before = order.clone();
        let cmd = transition_cmd(&order, OrderStatus::Confirmed, Side::Merchant, fx.now);

        let first = order.handle(&cmd).unwrap();
        let second = order.handle(&cmd).unwrap();

        assert_eq!(order, before);
        assert_eq!(first, second);
    }

    #[test]
    fn full_lifecycle_records_history_and_versions() {
        let fx = Fixture::new();
        let mut order = order_in_status(&fx, OrderStatus::Placed);

        for target in [
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Completed,
        ] {
            let events = order
                .handle(&transition_cmd(&order, target, Side::Merchant, fx.now))
                .unwrap();
            order.apply(&events[0]);
            assert_eq!(order.status(), target);
        }

        assert_eq!(order.version(), 5);
        let visited: Vec<OrderStatus> = order.history().iter().map(|c| c.to).collect();
        assert_eq!(
            visited,
            vec![
                OrderStatus::Confirmed,
                OrderStatus::Preparing,
                OrderStatus::Ready,
                OrderStatus::Completed
            ]
        );
        assert!(order.history().iter().all(|c| c.side == Side::Merchant));
        assert_eq!(order.cancelled_at(), None);
    }

    #[test]
    fn reschedule_updates_pickup_time() {
        let fx = Fixture::new();
        let mut order = order_in_status(&fx, OrderStatus::Confirmed);
        let pickup_time = fx.now + Duration::hours(1);

        let events = order
            .handle(&OrderCommand::ReschedulePickup(ReschedulePickup {
                order_id: order.id_typed(),
                pickup_time,
                side: Some(Side::Buyer),
                occurred_at: fx.now,
            }))
            .unwrap();
        order.apply(&events[0]);

        assert_eq!(order.pickup_time(), Some(pickup_time));
        assert!(order.is_preorder(fx.now));
        assert!(!order.is_preorder(pickup_time));
    }

    #[test]
    fn execute_returns_the_next_state_without_touching_self() {
        let fx = Fixture::new();
        let order = order_in_status(&fx, OrderStatus::Placed);
        let cmd = transition_cmd(&order, OrderStatus::Cancelled, Side::Merchant, fx.now);

        let (next, events) = order.execute(&cmd).unwrap();

        assert_eq!(order.status(), OrderStatus::Placed);
        assert_eq!(next.status(), OrderStatus::Cancelled);
        assert_eq!(next.version(), order.version() + 1);
        assert_eq!(events.len(), 1);
        assert_eq!(next.cancelled_at(), Some(fx.now));
    }

    #[test]
    fn apply_is_deterministic() {
        let fx = Fixture::new();
        let source = order_in_status(&fx, OrderStatus::Placed);
        let placed = OrderEvent::OrderPlaced(OrderPlaced {
            order_id: source.id_typed(),
            buyer_id: source.buyer_id(),
            merchant_id: source.merchant_id(),
            lines: source.lines().to_vec(),
            total: source.total(),
            notes: Some("no chili".to_string()),
            pickup_time: None,
            occurred_at: fx.now,
        });
        let cancelled = OrderEvent::StatusChanged(OrderStatusChanged {
            order_id: source.id_typed(),
            from: OrderStatus::Placed,
            to: OrderStatus::Cancelled,
            side: Side::Merchant,
            reason: Some("sold out".to_string()),
            occurred_at: fx.now,
        });

        let a = Order::from_events(source.id_typed(), [&placed, &cancelled]);
        let b = Order::from_events(source.id_typed(), [&placed, &cancelled]);

        assert_eq!(a, b);
        assert_eq!(a.status(), OrderStatus::Cancelled);
        assert_eq!(a.notes(), Some("no chili"));
        assert_eq!(a.cancellation_reason(), Some("sold out"));
        assert_eq!(a.version(), 2);
    }

    #[test]
    fn quantity_of_counts_units_per_product() {
        let fx = Fixture::new();
        let order = order_in_status(&fx, OrderStatus::Placed);
        let first = order.lines()[0].product_id;
        assert_eq!(order.quantity_of(first), 2);
        assert_eq!(order.quantity_of(ProductId::new()), 0);
    }

    #[test]
    fn event_types_are_namespaced() {
        let fx = Fixture::new();
        let order = order_in_status(&fx, OrderStatus::Placed);
        let events = order
            .handle(&transition_cmd(&order, OrderStatus::Cancelled, Side::Buyer, fx.now))
            .unwrap();
        assert_eq!(events[0].event_type(), "orders.order.status_changed");
        assert_eq!(events[0].occurred_at(), fx.now);
    }
}
