use core::str::FromStr;

use serde::{Deserialize, Serialize};

use preorder_auth::{Permission, Side};
use preorder_core::DomainError;

/// Order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Placed,
    Confirmed,
    Preparing,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Placed,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "placed",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Permission a principal's role must carry to move an order into this
    /// status.
    pub fn required_permission(&self) -> Permission {
        match self {
            OrderStatus::Placed => Permission::PLACE_ORDER,
            OrderStatus::Cancelled => Permission::CANCEL_ORDER,
            OrderStatus::Confirmed
            | OrderStatus::Preparing
            | OrderStatus::Ready
            | OrderStatus::Completed => Permission::FULFIL_ORDER,
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown order status '{s}'")))
    }
}

/// Who may drive an edge of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Initiator {
    Merchant,
    BuyerOrMerchant,
}

impl Initiator {
    pub fn permits(self, side: Side) -> bool {
        match self {
            Initiator::Merchant => side == Side::Merchant,
            Initiator::BuyerOrMerchant => true,
        }
    }
}

/// One legal (from, to) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub initiator: Initiator,
}

const fn edge(from: OrderStatus, to: OrderStatus, initiator: Initiator) -> Edge {
    Edge { from, to, initiator }
}

/// The complete transition table. Anything not listed is illegal, including
/// "transitions" to the current status.
pub const TRANSITIONS: &[Edge] = &[
    edge(OrderStatus::Placed, OrderStatus::Confirmed, Initiator::Merchant),
    edge(OrderStatus::Confirmed, OrderStatus::Preparing, Initiator::Merchant),
    edge(OrderStatus::Preparing, OrderStatus::Ready, Initiator::Merchant),
    edge(OrderStatus::Ready, OrderStatus::Completed, Initiator::Merchant),
    edge(OrderStatus::Placed, OrderStatus::Cancelled, Initiator::BuyerOrMerchant),
    edge(OrderStatus::Confirmed, OrderStatus::Cancelled, Initiator::BuyerOrMerchant),
    edge(OrderStatus::Preparing, OrderStatus::Cancelled, Initiator::BuyerOrMerchant),
];

impl Edge {
    pub fn lookup(from: OrderStatus, to: OrderStatus) -> Option<&'static Edge> {
        TRANSITIONS.iter().find(|e| e.from == from && e.to == to)
    }
}
