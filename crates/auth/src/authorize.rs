use serde::{Deserialize, Serialize};
use thiserror::Error;

use preorder_core::{DomainError, DomainResult, UserId};

use crate::{Permission, Principal, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: role '{role}' lacks permission '{permission}'")]
    Forbidden { role: Role, permission: String },
}

impl From<AuthzError> for DomainError {
    fn from(_: AuthzError) -> Self {
        DomainError::Unauthorized
    }
}

/// Role-level permission check.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    if principal.has_permission(required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden {
            role: principal.role,
            permission: required.as_str().to_string(),
        })
    }
}

/// The side of an order a principal acts on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buyer,
    Merchant,
}

impl core::fmt::Display for Side {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Side::Buyer => "buyer",
            Side::Merchant => "merchant",
        })
    }
}

/// The identities attached to one order.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OrderParties {
    pub buyer_id: UserId,
    /// Owner of the order's merchant, if the merchant record still resolves.
    pub merchant_owner: Option<UserId>,
}

/// How a principal relates to an order.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OrderAccess {
    /// Acts on one side of the order.
    Party(Side),
    /// Identity belongs to the order but the current role cannot act on it
    /// (e.g. the merchant owner signed in with the buyer role).
    Related,
    /// Holds `orders.read_all`: sees every order but acts on no side.
    Admin,
}

impl OrderAccess {
    pub fn side(&self) -> Option<Side> {
        match self {
            OrderAccess::Party(side) => Some(*side),
            OrderAccess::Related | OrderAccess::Admin => None,
        }
    }
}

/// Resolve the principal's relation to an order.
///
/// A principal with no relation at all gets `NotFound`, so the answer never
/// reveals that the order exists. Reading orders one is not a party to needs
/// `orders.read_all`.
pub fn order_access(principal: &Principal, parties: &OrderParties) -> DomainResult<OrderAccess> {
    let uid = principal.user_id;
    let is_owner = parties.merchant_owner == Some(uid);
    let is_buyer = parties.buyer_id == uid;
    let reads_all = principal.has_permission(&Permission::READ_ALL_ORDERS);

    match principal.role {
        Role::Seller if is_owner => Ok(OrderAccess::Party(Side::Merchant)),
        Role::Buyer | Role::Seller if is_buyer => Ok(OrderAccess::Party(Side::Buyer)),
        _ if reads_all => Ok(OrderAccess::Admin),
        _ if is_owner => Ok(OrderAccess::Related),
        _ => Err(DomainError::NotFound),
    }
}

/// Which orders a principal may list.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ListScope {
    /// Orders placed by this buyer.
    PlacedBy(UserId),
    /// Orders against merchants owned by this operator.
    OwnedMerchants(UserId),
    All,
}

/// `All` needs `orders.read_all`; everyone else sees their own side.
pub fn list_scope(principal: &Principal) -> ListScope {
    if principal.has_permission(&Permission::READ_ALL_ORDERS) {
        return ListScope::All;
    }
    match principal.role {
        Role::Seller => ListScope::OwnedMerchants(principal.user_id),
        Role::Buyer | Role::Admin => ListScope::PlacedBy(principal.user_id),
    }
}
