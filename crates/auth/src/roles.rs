use core::str::FromStr;

use serde::{Deserialize, Serialize};

use preorder_core::DomainError;

use crate::Permission;

/// Role carried by an authenticated session.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Student buyer browsing the storefront.
    Buyer,
    /// Merchant operator using the seller console.
    Seller,
    /// Platform administrator.
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Buyer => "buyer",
            Role::Seller => "seller",
            Role::Admin => "admin",
        }
    }

    /// Static role → permission mapping.
    ///
    /// Sellers can also shop, so they hold `orders.place` next to the
    /// fulfilment permission.
    pub fn permissions(&self) -> &'static [Permission] {
        const BUYER: &[Permission] = &[Permission::PLACE_ORDER, Permission::CANCEL_ORDER];
        const SELLER: &[Permission] = &[
            Permission::PLACE_ORDER,
            Permission::CANCEL_ORDER,
            Permission::FULFIL_ORDER,
        ];
        const ADMIN: &[Permission] = &[Permission::READ_ALL_ORDERS];

        match self {
            Role::Buyer => BUYER,
            Role::Seller => SELLER,
            Role::Admin => ADMIN,
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buyer" => Ok(Role::Buyer),
            "seller" => Ok(Role::Seller),
            "admin" => Ok(Role::Admin),
            other => Err(DomainError::validation(format!("unknown role '{other}'"))),
        }
    }
}
