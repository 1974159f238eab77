use serde::{Deserialize, Serialize};

use preorder_core::UserId;

use crate::{Permission, Role};

/// An authenticated actor: identity from the session plus the role it acts in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn buyer(user_id: UserId) -> Self {
        Self::new(user_id, Role::Buyer)
    }

    pub fn seller(user_id: UserId) -> Self {
        Self::new(user_id, Role::Seller)
    }

    pub fn admin(user_id: UserId) -> Self {
        Self::new(user_id, Role::Admin)
    }

    pub fn has_permission(&self, required: &Permission) -> bool {
        self.role.permissions().contains(required)
    }
}
