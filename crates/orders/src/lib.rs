//! Pre-order lifecycle domain module.
//!
//! This crate contains the order aggregate and the lifecycle engine: the
//! rules for pricing a new order against catalog snapshots, the fixed status
//! state machine, and the stock deltas each decision implies. Everything
//! here is deterministic domain logic (no IO, no HTTP, no storage).

pub mod lifecycle;
pub mod order;
pub mod status;

pub use lifecycle::{
    PlacementRequest, PricedOrder, RequestedLine, TransitionDecision, place, reschedule_pickup,
    restock_for, transition, validate_and_price, validate_notes,
};
pub use order::{
    Order, OrderCommand, OrderEvent, OrderLine, OrderPlaced, OrderStatusChanged,
    PickupRescheduled, ReschedulePickup, StatusChange, TransitionOrder,
};
pub use status::{Edge, Initiator, OrderStatus, TRANSITIONS};

#[cfg(test)]
mod test_support;
