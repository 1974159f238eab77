use std::collections::HashMap;

use chrono::{DateTime, Utc};

use preorder_auth::Side;
use preorder_catalog::{Merchant, MerchantStatus, Product};
use preorder_core::{Aggregate, OrderId, ProductId, UserId};

use crate::lifecycle::{PlacementRequest, RequestedLine, place, transition, validate_and_price};
use crate::order::Order;
use crate::status::OrderStatus;

pub(crate) struct Fixture {
    pub merchant: Merchant,
    pub buyer: UserId,
    pub now: DateTime<Utc>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            merchant: Merchant::new(UserId::new(), "Warung Bu Sri", MerchantStatus::Active),
            buyer: UserId::new(),
            now: Utc::now(),
        }
    }

    pub fn product(&self, name: &str, price: u64, stock: u32) -> Product {
        Product::new(self.merchant.id, name, price, stock)
    }

    pub fn snapshot(&self, products: &[&Product]) -> HashMap<ProductId, Product> {
        products.iter().map(|p| (p.id, (*p).clone())).collect()
    }

    pub fn request(&self, lines: Vec<RequestedLine>) -> PlacementRequest {
        PlacementRequest::new(self.buyer, self.merchant.id, lines)
    }
}

/// A two-line order driven through the table until it reaches `status`.
pub(crate) fn order_in_status(fx: &Fixture, status: OrderStatus) -> Order {
    let rice = fx.product("Nasi goreng", 15_000, 10);
    let tea = fx.product("Es teh", 4_000, 10);
    let request = fx.request(vec![
        RequestedLine::new(rice.id, 2),
        RequestedLine::new(tea.id, 1),
    ]);
    let priced = validate_and_price(&request, &fx.merchant, &fx.snapshot(&[&rice, &tea]), fx.now)
        .expect("fixture order should price");

    let order_id = OrderId::new();
    let mut order = Order::from_events(order_id, [&place(order_id, &request, &priced, fx.now)]);

    let path: &[OrderStatus] = match status {
        OrderStatus::Placed => &[],
        OrderStatus::Confirmed => &[OrderStatus::Confirmed],
        OrderStatus::Preparing => &[OrderStatus::Confirmed, OrderStatus::Preparing],
        OrderStatus::Ready => &[
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::Ready,
        ],
        OrderStatus::Completed => &[
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Completed,
        ],
        OrderStatus::Cancelled => &[OrderStatus::Cancelled],
    };

    for target in path {
        let side = if *target == OrderStatus::Cancelled {
            Side::Buyer
        } else {
            Side::Merchant
        };
        let decision = transition(&order, *target, Some(side), None, fx.now)
            .expect("fixture path follows the table");
        order.apply(&decision.event);
    }
    order
}
